//! Relative ages ("3m", "in 2h") and their periodic refresh

use crate::i18n::Translator;
use crate::tree::{NodeId, UiTree};

const AGE_NAMES: [&str; 7] = ["s", "m", "h", " days", " weeks", " months", " years"];
const AGE_DIV: [u64; 7] = [1, 60, 3_600, 86_400, 604_800, 2_419_200, 31_536_000];
/// Zero means unbounded
const AGE_LIMIT: [u64; 7] = [120, 7_200, 172_800, 1_209_600, 4_838_400, 63_072_000, 0];
/// Seconds between refreshes while a span of that bucket is on screen
const AGE_UPDATE: [u64; 7] = [5, 10, 300, 1_800, 3_600, 43_200, 43_200];

/// Refresh interval when no age is displayed at all
pub const IDLE_REFRESH_SECS: u64 = 24 * 3_600;

/// Attribute holding the absolute unix time of an age span
pub const UT_ATTR: &str = "ut";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Age {
    /// Index into the unit table, also the `age-<bucket>` class
    pub bucket: usize,
    pub text: String,
}

impl Age {
    pub fn class(&self) -> String {
        format!("age-{}", self.bucket)
    }

    pub fn update_secs(&self) -> u64 {
        AGE_UPDATE[self.bucket]
    }
}

/// Age of `secs` relative to `now`, both unix seconds
///
/// `secs == 0` means "no time" and yields `None`. Times in the future get an
/// "in " prefix.
pub fn agify(now: i64, secs: i64, tr: &Translator) -> Option<Age> {
    if secs == 0 {
        return None;
    }
    let future = secs > now;
    let d = secs.abs_diff(now);
    let bucket = (0..AGE_NAMES.len()).find(|n| d < AGE_LIMIT[*n] || AGE_LIMIT[*n] == 0)?;
    let value = d.div_ceil(AGE_DIV[bucket]);
    Some(Age {
        bucket,
        text: format!(
            "{}{}{}",
            if future { "in " } else { "" },
            value,
            tr.translate(AGE_NAMES[bucket], &[])
        ),
    })
}

/// Makes `node` an age span for `secs`, or blanks it when there is no time
pub fn stamp(tree: &mut UiTree, node: NodeId, now: i64, secs: i64, tr: &Translator) {
    tree.replace_class_prefix(node, "age-", None);
    match agify(now, secs, tr) {
        Some(age) => {
            tree.add_class(node, &age.class());
            tree.set_attr(node, UT_ATTR, secs.to_string());
            tree.set_text(node, age.text);
        }
        None => {
            tree.remove_attr(node, UT_ATTR);
            tree.set_text(node, "");
        }
    }
}

/// Re-renders every displayed age span
///
/// Returns the number of seconds until the next refresh is useful: the
/// smallest update interval among the buckets on screen.
pub fn refresh(tree: &mut UiTree, now: i64, tr: &Translator) -> u64 {
    let mut next = IDLE_REFRESH_SECS;
    for node in tree.find_by_class_prefix("age-") {
        let Some(secs) = tree.attr(node, UT_ATTR).and_then(|s| s.parse::<i64>().ok()) else {
            continue;
        };
        stamp(tree, node, now, secs, tr);
        if let Some(age) = agify(now, secs, tr) {
            next = next.min(age.update_secs());
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tr() -> Translator {
        Translator::default()
    }

    #[test]
    fn test_agify_buckets() {
        let now = 1_000_000;
        assert_eq!(agify(now, now - 30, &tr()).unwrap().text, "30s");
        assert_eq!(agify(now, now - 130, &tr()).unwrap().text, "3m");
        assert_eq!(agify(now, now - 7_200, &tr()).unwrap().text, "2h");
        assert_eq!(agify(now, now - 3 * 86_400, &tr()).unwrap().text, "3 days");
        let old = agify(now * 100, 1, &tr()).unwrap();
        assert_eq!(old.bucket, 6);
        assert!(old.text.ends_with(" years"));
    }

    #[test]
    fn test_agify_future_and_zero() {
        assert_eq!(agify(100, 160, &tr()).unwrap().text, "in 60s");
        assert_eq!(agify(100, 0, &tr()), None);
    }

    #[test]
    fn test_refresh_picks_smallest_interval() {
        let mut tree = UiTree::new();
        let root = tree.root();
        let now = 1_000_000;
        let hours = tree.ensure_child(root, "a", "span");
        stamp(&mut tree, hours, now, now - 4 * 3_600, &tr());
        assert_eq!(refresh(&mut tree, now, &tr()), 300);

        let secs = tree.ensure_child(root, "b", "span");
        stamp(&mut tree, secs, now, now - 10, &tr());
        assert_eq!(refresh(&mut tree, now + 100, &tr()), 5);
        assert_eq!(tree.text(secs), "110s");
    }

    #[test]
    fn test_refresh_idle_without_spans() {
        let mut tree = UiTree::new();
        assert_eq!(refresh(&mut tree, 5, &tr()), IDLE_REFRESH_SECS);
    }

    #[test]
    fn test_translated_units() {
        let ja = Translator::new(crate::i18n::Language::Japanese);
        assert_eq!(agify(1_000, 1_000 - 7_200, &ja).unwrap().text, "2時間");
    }
}
