//! Rule based English lemmatizer: an irregular-form table first, then inflection suffix rules.

use std::collections::{HashMap, HashSet};

const IRREGULAR: &[(&str, &str)] = &[
    ("ran", "run"), ("went", "go"), ("gone", "go"), ("goes", "go"), ("going", "go"),
    ("saw", "see"), ("seen", "see"), ("made", "make"), ("said", "say"), ("took", "take"),
    ("taken", "take"), ("gave", "give"), ("given", "give"), ("came", "come"), ("knew", "know"),
    ("known", "know"), ("found", "find"), ("thought", "think"), ("told", "tell"),
    ("became", "become"), ("felt", "feel"), ("kept", "keep"), ("held", "hold"),
    ("brought", "bring"), ("bought", "buy"), ("began", "begin"), ("begun", "begin"),
    ("wrote", "write"), ("written", "write"), ("writing", "write"), ("stood", "stand"),
    ("understood", "understand"), ("lost", "lose"), ("paid", "pay"), ("met", "meet"),
    ("sent", "send"), ("built", "build"), ("spent", "spend"), ("led", "lead"), ("sold", "sell"),
    ("broke", "break"), ("broken", "break"), ("chose", "choose"), ("chosen", "choose"),
    ("stole", "steal"), ("stolen", "steal"), ("hid", "hide"), ("hidden", "hide"),
    ("caught", "catch"), ("fought", "fight"), ("taught", "teach"), ("sought", "seek"),
    ("struck", "strike"), ("fell", "fall"), ("drove", "drive"), ("driven", "drive"),
    ("ate", "eat"), ("eaten", "eat"), ("flew", "fly"), ("flown", "fly"), ("grew", "grow"),
    ("grown", "grow"), ("threw", "throw"), ("thrown", "throw"), ("spoke", "speak"),
    ("spoken", "speak"), ("forgot", "forget"), ("forgotten", "forget"), ("got", "get"),
    ("gotten", "get"), ("children", "child"), ("men", "man"), ("women", "woman"),
    ("mice", "mouse"), ("feet", "foot"), ("teeth", "tooth"), ("geese", "goose"),
    ("indices", "index"), ("matrices", "matrix"), ("analyses", "analysis"),
    ("crises", "crisis"), ("criteria", "criterion"), ("phenomena", "phenomenon"),
    ("using", "use"), ("used", "use"), ("uses", "use"), ("created", "create"),
    ("creating", "create"), ("stored", "store"), ("storing", "store"), ("ignored", "ignore"),
    ("ignoring", "ignore"), ("caches", "cache"), ("cookies", "cookie"), ("movies", "movie"),
    ("zombies", "zombie"),
];

const INVARIANT: &[&str] = &[
    "news", "series", "species", "analysis", "basis", "crisis", "thesis", "status", "virus",
    "campus", "census", "consensus", "corpus", "bonus", "plus", "always", "perhaps", "whereas",
    "thus", "thing", "nothing", "something", "anything", "everything", "morning", "evening",
    "ceiling", "during", "bring", "string", "spring", "king", "ring", "wing", "sibling", "hundred",
    "sacred", "windows", "ios",
];

pub(crate) struct Lemmatizer {
    irregular: HashMap<&'static str, &'static str>,
    invariant: HashSet<&'static str>,
}

impl Lemmatizer {
    pub(crate) fn new() -> Self {
        Self {
            irregular: IRREGULAR.iter().copied().collect(),
            invariant: INVARIANT.iter().copied().collect(),
        }
    }

    /// `token` must already be lowercase and purely alphabetic.
    pub(crate) fn lemmatize(&self, token: &str) -> String {
        if let Some(base) = self.irregular.get(token) {
            return (*base).to_string();
        }
        if token.chars().count() <= 3 || self.invariant.contains(token) {
            return token.to_string();
        }

        if let Some(lemma) = plural(token) {
            return lemma;
        }
        if let Some(stem) = token.strip_suffix("ied") {
            if token.len() > 4 {
                return format!("{stem}y");
            }
        }
        if let Some(stem) = token.strip_suffix("ing") {
            if stem.len() >= 3 && has_vowel(stem) {
                return repair_stem(stem);
            }
            return token.to_string();
        }
        if let Some(stem) = token.strip_suffix("ed") {
            if !token.ends_with("eed") && stem.len() >= 3 && has_vowel(stem) {
                return repair_stem(stem);
            }
        }
        token.to_string()
    }
}

fn plural(token: &str) -> Option<String> {
    if token.ends_with("ies") && token.len() > 4 {
        return Some(format!("{}y", &token[..token.len() - 3]));
    }
    if token.ends_with("sses")
        || token.ends_with("ches")
        || token.ends_with("shes")
        || token.ends_with("xes")
        || token.ends_with("zzes")
    {
        return Some(token[..token.len() - 2].to_string());
    }
    if token.ends_with('s') && !token.ends_with("ss") && !token.ends_with("us") && !token.ends_with("is") {
        return Some(token[..token.len() - 1].to_string());
    }
    None
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn has_vowel(s: &str) -> bool {
    s.chars().any(|c| is_vowel(c) || c == 'y')
}

/// Undo consonant doubling (`runn` -> `run`) or restore a dropped final `e` (`mak` -> `make`).
fn repair_stem(stem: &str) -> String {
    let chars: Vec<char> = stem.chars().collect();
    let n = chars.len();
    let (last, prev) = (chars[n - 1], chars[n - 2]);

    if last == prev && !is_vowel(last) && !matches!(last, 'l' | 's' | 'z') {
        return chars[..n - 1].iter().collect();
    }
    if needs_final_e(&chars) {
        return format!("{stem}e");
    }
    stem.to_string()
}

fn needs_final_e(chars: &[char]) -> bool {
    let n = chars.len();
    let last = chars[n - 1];
    let prev = chars[n - 2];
    let before = if n >= 3 { Some(chars[n - 3]) } else { None };
    let consonant_before = before.map_or(false, |c| !is_vowel(c));

    if matches!(prev, 'b' | 'p' | 'd' | 't' | 'g' | 'k' | 'f' | 'z') && last == 'l' {
        return true;
    }

    match last {
        'v' | 'u' | 'c' => true,
        'z' => prev != 'z',
        's' => {
            if prev == 's' {
                false
            } else if !is_vowel(prev) {
                true
            } else {
                !(prev == 'u' && consonant_before)
            }
        }
        't' => matches!(prev, 'a' | 'u' | 'o') && consonant_before,
        'd' => matches!(prev, 'i' | 'u' | 'o') && consonant_before,
        'r' => (matches!(prev, 'a' | 'i' | 'u') && consonant_before) || (prev == 'i' && before == Some('u')),
        'n' => prev == 'i' && consonant_before,
        'm' => matches!(prev, 'a' | 'i' | 'u') && consonant_before,
        'l' => matches!(prev, 'i' | 'u') && consonant_before,
        'b' => prev == 'i' && consonant_before,
        'k' => matches!(prev, 'a' | 'i' | 'o') && consonant_before && n <= 6,
        'p' => matches!(prev, 'a' | 'i' | 'o' | 'y') && consonant_before && n <= 4,
        'g' => match prev {
            'a' => consonant_before,
            'r' | 'd' => true,
            'n' => (before == Some('e') && n >= 6) || (before == Some('a') && n >= 5),
            _ => false,
        },
        _ => false,
    }
}
