//! Reading-progress engine for a paged e-book reader.
//!
//! Surface side: [`locator`] and [`pagination`] turn between character
//! progress and scroll offsets on a [`surface::RenderSurface`]. Host side:
//! [`session`] owns the reading position, bookmarks and speed tracking for an
//! open book, backed by a [`cache::ProgressStore`].

pub mod book_index;
pub mod cache;
pub mod char_count;
pub mod config;
pub mod content;
pub mod locator;
pub mod pagination;
pub mod session;
pub mod surface;
pub mod tracking;

#[cfg(test)]
mod test_support;
