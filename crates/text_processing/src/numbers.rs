//! Cardinal number recognition
//!
//! Finds integers written as digits (`"25"`, `"1,200"`) or as English words
//! (`"twenty"`, `"twenty-one"`, `"one hundred and five"`, `"a thousand"`).
//! Recognition never fails: unparsable text simply yields no numbers.

use once_cell::sync::Lazy;
use regex::Regex;

static DIGITS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{1,3}(?:,\d{3})+$|^-?\d+$").unwrap());

/// A number found in text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizedNumber {
    /// Resolved value
    pub value: i64,
    /// Source words as they appeared (lowercased)
    pub text: String,
}

fn unit_value(word: &str) -> Option<i64> {
    let value = match word {
        "zero" => 0,
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        _ => return None,
    };
    Some(value)
}

fn scale_value(word: &str) -> Option<i64> {
    match word {
        "hundred" => Some(100),
        "thousand" => Some(1_000),
        "million" => Some(1_000_000),
        _ => None,
    }
}

fn is_number_word(word: &str) -> bool {
    unit_value(word).is_some() || scale_value(word).is_some()
}

/// Accumulates one spelled-out number
#[derive(Default)]
struct WordNumber {
    total: i64,
    current: i64,
    words: Vec<String>,
}

impl WordNumber {
    fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn push_unit(&mut self, word: &str, value: i64) {
        self.current = self.current.saturating_add(value);
        self.words.push(word.to_string());
    }

    fn push_scale(&mut self, word: &str, scale: i64) {
        let base = if self.current == 0 { 1 } else { self.current };
        if scale == 100 {
            self.current = base.saturating_mul(scale);
        } else {
            self.total = self.total.saturating_add(base.saturating_mul(scale));
            self.current = 0;
        }
        self.words.push(word.to_string());
    }

    fn finish(self) -> Option<RecognizedNumber> {
        if self.words.is_empty() {
            return None;
        }
        Some(RecognizedNumber {
            value: self.total.saturating_add(self.current),
            text: self.words.join(" "),
        })
    }
}

/// Split text into lowercase words, keeping hyphenated number words apart
fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .flat_map(|chunk| {
            let trimmed = chunk
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '-')
                .trim_end_matches('-')
                .to_lowercase();
            if trimmed.contains('-') && !trimmed.starts_with('-') {
                trimmed.split('-').map(str::to_string).collect::<Vec<_>>()
            } else {
                vec![trimmed]
            }
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// Recognize all integers in text, in order of appearance
pub fn recognize_numbers(text: &str) -> Vec<RecognizedNumber> {
    let tokens = words(text);
    let mut found = Vec::new();
    let mut pending = WordNumber::default();

    let mut idx = 0;
    while idx < tokens.len() {
        let word = tokens[idx].as_str();
        let next = tokens.get(idx + 1).map(String::as_str);

        if DIGITS_PATTERN.is_match(word) {
            if let Some(number) = std::mem::take(&mut pending).finish() {
                found.push(number);
            }
            if let Ok(value) = word.replace(',', "").parse::<i64>() {
                found.push(RecognizedNumber {
                    value,
                    text: word.to_string(),
                });
            }
        } else if let Some(value) = unit_value(word) {
            pending.push_unit(word, value);
        } else if let Some(scale) = scale_value(word) {
            pending.push_scale(word, scale);
        } else if word == "a" && next.and_then(scale_value).is_some() && pending.is_empty() {
            // "a hundred", "a thousand"
            pending.push_unit(word, 1);
        } else if word == "and" && !pending.is_empty() && next.map_or(false, is_number_word) {
            // "one hundred and five"
        } else if let Some(number) = std::mem::take(&mut pending).finish() {
            found.push(number);
        }

        idx += 1;
    }

    if let Some(number) = pending.finish() {
        found.push(number);
    }

    found
}

/// First integer in text, if any
pub fn first_integer(text: &str) -> Option<i64> {
    recognize_numbers(text).first().map(|n| n.value)
}
