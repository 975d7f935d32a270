use std::collections::HashSet;

/// Codes already claimed in one naming scope.
///
/// The main schema tree owns exactly one scope across every nesting depth;
/// each named definition gets its own.
#[derive(Clone, Debug, Default)]
pub struct NameScope {
    used: HashSet<String>,
}

impl NameScope {
    pub fn new() -> Self { Self::default() }

    pub fn contains(&self, code: &str) -> bool { self.used.contains(code) }

    pub fn len(&self) -> usize { self.used.len() }

    pub fn is_empty(&self) -> bool { self.used.is_empty() }

    /// Pick a short code for `name` and reserve it. First unused wins:
    ///
    /// 1. first character
    /// 2. first two characters
    /// 3. first character + each later character, left to right
    /// 4. first character + 1, 2, 3, ...
    ///
    /// Candidates come from the lowercase form of `name`.
    pub fn allocate(&mut self, name: &str) -> String {
        let lower = name.to_lowercase();
        let chars = lower.chars().collect::<Vec<_>>();
        let first = chars.first().copied().unwrap_or('_');

        let mut candidates = Vec::with_capacity(chars.len() + 1);
        candidates.push(first.to_string());
        if chars.len() >= 2 {
            candidates.push(chars[..2].iter().collect::<String>());
        }
        for c in chars.iter().skip(1) {
            candidates.push(format!("{first}{c}"));
        }

        if let Some(code) = candidates.into_iter().find(|c| !self.used.contains(c)) {
            return self.reserve(code);
        }

        // numeric suffix is unbounded, so this always terminates
        let mut n: u64 = 1;
        loop {
            let code = format!("{first}{n}");
            if !self.used.contains(&code) {
                return self.reserve(code);
            }
            n += 1;
        }
    }

    fn reserve(&mut self, code: String) -> String {
        self.used.insert(code.clone());
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocate_all(names: &[&str]) -> Vec<String> {
        let mut scope = NameScope::new();
        names.iter().map(|n| scope.allocate(n)).collect()
    }

    #[test]
    fn distinct_initials_take_one_letter() {
        assert_eq!(allocate_all(&["first_name", "last_name", "age"]), ["f", "l", "a"]);
    }

    #[test]
    fn shared_initial_falls_back_in_declaration_order() {
        assert_eq!(allocate_all(&["summary", "samples", "source"]), ["s", "sa", "so"]);
        assert_eq!(allocate_all(&["age", "address"]), ["a", "ad"]);
    }

    #[test]
    fn later_characters_are_tried_before_digits() {
        // "sa" taken by the first two, so "sample" walks its letters
        assert_eq!(allocate_all(&["s", "sa", "sample"]), ["s", "sa", "sm"]);
        // every pairing exhausted → numeric suffix
        assert_eq!(allocate_all(&["a", "aa", "aa", "aa"]), ["a", "aa", "a1", "a2"]);
    }

    #[test]
    fn candidates_are_case_insensitive() {
        assert_eq!(allocate_all(&["Name", "note"]), ["n", "no"]);
        assert_eq!(allocate_all(&["ID", "id"]), ["i", "id"]);
    }

    #[test]
    fn multibyte_names_split_on_chars() {
        assert_eq!(allocate_all(&["ümlaut", "übung"]), ["ü", "üb"]);
    }

    #[test]
    fn empty_name_uses_underscore() {
        assert_eq!(allocate_all(&["", ""]), ["_", "_1"]);
    }

    #[test]
    fn no_code_is_handed_out_twice() {
        let names = (0..500).map(|i| format!("field_{i}")).collect::<Vec<_>>();
        let mut scope = NameScope::new();
        assert!(scope.is_empty());
        let codes = names.iter().map(|n| scope.allocate(n)).collect::<Vec<_>>();
        assert!(codes.iter().all(|c| scope.contains(c)));
        assert!(!scope.contains("zz"));
        let unique = codes.iter().collect::<HashSet<_>>();
        assert_eq!(unique.len(), codes.len());
        assert_eq!(scope.len(), codes.len());
    }

    #[test]
    fn allocation_is_deterministic() {
        let names = ["summary", "samples", "source", "status", "state", "s", "st"];
        assert_eq!(allocate_all(&names), allocate_all(&names));
    }
}
