//! Book-character counting.
//!
//! A "book character" is any code point from a fixed allow-list: ASCII
//! digits, Latin letters, a few enclosed/full-width symbols and the Japanese
//! syllabaries and ideographs. Punctuation, whitespace and everything else
//! are dropped before counting, so progress and reading speed don't drift
//! between sources that format the same prose differently.

use crate::content::{ContentTree, NodeId, TextWalker};

/// Allowed code point ranges, sorted and non-overlapping.
///
/// Latin letters are counted in both cases, and full-width Latin likewise.
pub const PROSE_RANGES: &[(char, char)] = &[
    ('0', '9'),
    ('A', 'Z'),
    ('a', 'z'),
    ('\u{25CB}', '\u{25CB}'), // ○
    ('\u{25EF}', '\u{25EF}'), // ◯
    ('\u{2E80}', '\u{2E99}'), // CJK radicals supplement
    ('\u{2E9B}', '\u{2EF3}'),
    ('\u{2F00}', '\u{2FD5}'), // Kangxi radicals
    ('\u{3005}', '\u{3007}'), // 々 〆 〇
    ('\u{303B}', '\u{303B}'), // 〻
    ('\u{3041}', '\u{3096}'), // hiragana
    ('\u{309D}', '\u{309E}'), // ゝ ゞ
    ('\u{30A1}', '\u{30FA}'), // katakana
    ('\u{30FC}', '\u{30FC}'), // ー
    ('\u{3400}', '\u{4DBF}'), // ext A
    ('\u{4E00}', '\u{9FFF}'),
    ('\u{FA0E}', '\u{FA0F}'),
    ('\u{FA11}', '\u{FA11}'),
    ('\u{FA13}', '\u{FA14}'),
    ('\u{FA1F}', '\u{FA1F}'),
    ('\u{FA21}', '\u{FA21}'),
    ('\u{FA23}', '\u{FA24}'),
    ('\u{FA27}', '\u{FA29}'),
    ('\u{FF10}', '\u{FF19}'), // full-width digits
    ('\u{FF21}', '\u{FF3A}'), // full-width Latin
    ('\u{FF41}', '\u{FF5A}'),
    ('\u{FF66}', '\u{FF9D}'), // half-width katakana
    ('\u{20000}', '\u{2A6DF}'),
    ('\u{2A700}', '\u{2B739}'),
    ('\u{2B740}', '\u{2B81D}'),
    ('\u{2B820}', '\u{2CEA1}'),
    ('\u{2CEB0}', '\u{2EBE0}'),
    ('\u{2EBF0}', '\u{2EE5D}'),
    ('\u{30000}', '\u{3134A}'),
    ('\u{31350}', '\u{323AF}'),
];

/// Counts book characters against an allow-list of code point ranges.
#[derive(Debug, Clone, Copy)]
pub struct CharacterCounter {
    ranges: &'static [(char, char)],
}

impl Default for CharacterCounter {
    fn default() -> Self {
        Self::new(PROSE_RANGES)
    }
}

impl CharacterCounter {
    /// `ranges` must be sorted by start and must not overlap.
    pub const fn new(ranges: &'static [(char, char)]) -> Self {
        Self { ranges }
    }

    pub fn is_counted(&self, ch: char) -> bool {
        let idx = self.ranges.partition_point(|(_, end)| *end < ch);
        self.ranges
            .get(idx)
            .is_some_and(|(start, end)| *start <= ch && ch <= *end)
    }

    /// Number of book characters in `text`.
    pub fn count_chars(&self, text: &str) -> usize {
        text.chars().filter(|ch| self.is_counted(*ch)).count()
    }

    /// Book characters in a single text run; zero for element nodes.
    pub fn count_run(&self, tree: &ContentTree, run: NodeId) -> usize {
        tree.text(run).map_or(0, |text| self.count_chars(text))
    }

    /// Book characters in every prose run under `root`, annotations excluded.
    pub fn count_subtree(&self, tree: &ContentTree, root: NodeId) -> usize {
        TextWalker::new(tree, root)
            .map(|run| self.count_run(tree, run))
            .sum()
    }

    /// Book characters in the whole document.
    pub fn count_document(&self, tree: &ContentTree) -> usize {
        self.count_subtree(tree, tree.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_sorted_and_disjoint() {
        for pair in PROSE_RANGES.windows(2) {
            assert!(pair[0].0 <= pair[0].1);
            assert!(pair[0].1 < pair[1].0, "{:?} overlaps {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn strips_punctuation_and_whitespace() {
        let counter = CharacterCounter::default();
        assert_eq!(counter.count_chars("「吾輩は猫である。」"), 7);
        assert_eq!(counter.count_chars("  、。！？…  \n"), 0);
        assert_eq!(counter.count_chars("ABC 123"), 6);
    }

    #[test]
    fn keeps_full_width_and_half_width_forms() {
        let counter = CharacterCounter::default();
        assert_eq!(counter.count_chars("ＡＢ１２ｱｲ"), 6);
        assert_eq!(counter.count_chars("ー々〇"), 3);
        assert_eq!(counter.count_chars("・"), 0);
    }

    #[test]
    fn counts_supplementary_plane_ideographs() {
        let counter = CharacterCounter::default();
        assert_eq!(counter.count_chars("\u{20B9F}る"), 2);
    }

    #[test]
    fn annotation_text_is_not_counted() {
        let mut tree = ContentTree::new();
        let root = tree.root();
        let p = tree.append_element(root, "p");
        tree.append_text(p, "今日は");
        let ruby = tree.append_element(p, "ruby");
        tree.append_text(ruby, "漢字");
        let rt = tree.append_element(ruby, "rt");
        tree.append_text(rt, "かんじ");
        let rp = tree.append_element(ruby, "rp");
        tree.append_text(rp, "（");

        let counter = CharacterCounter::default();
        assert_eq!(counter.count_document(&tree), 5);
        assert_eq!(counter.count_subtree(&tree, rt), 0);
    }
}
