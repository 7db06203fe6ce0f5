//! Glob-style wildcard matching for text criteria
//!
//! `*` matches any run of characters, `?` exactly one, and `~` makes the
//! next pattern character literal (`~*`, `~?`, `~~`). Comparison ignores
//! case. Used by the criteria functions (COUNTIF, SUMIF, MATCH) and SEARCH.

/// Patterns longer than this never match
pub const MAX_PATTERN_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternToken {
    Star,
    Any,
    Literal(char),
}

/// A compiled wildcard pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wildcard {
    tokens: Vec<PatternToken>,
    too_long: bool,
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

impl Wildcard {
    /// Compile a pattern
    ///
    /// A trailing `~` with nothing left to escape is ignored.
    pub fn new(pattern: &str) -> Self {
        let chars: Vec<char> = pattern.chars().collect();
        if chars.len() > MAX_PATTERN_LEN {
            return Self {
                tokens: Vec::new(),
                too_long: true,
            };
        }

        let trailing_tildes = chars.iter().rev().take_while(|&&c| c == '~').count();
        let end = if trailing_tildes % 2 == 1 {
            chars.len() - 1
        } else {
            chars.len()
        };

        let mut tokens = Vec::with_capacity(end);
        let mut i = 0;
        while i < end {
            let token = match chars[i] {
                '~' if i + 1 < end => {
                    i += 1;
                    PatternToken::Literal(fold(chars[i]))
                }
                '*' => PatternToken::Star,
                '?' => PatternToken::Any,
                c => PatternToken::Literal(fold(c)),
            };
            tokens.push(token);
            i += 1;
        }

        Self {
            tokens,
            too_long: false,
        }
    }

    /// Whether the pattern contains `*` or `?` outside an escape
    pub fn has_wildcards(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| matches!(t, PatternToken::Star | PatternToken::Any))
    }

    /// Whole-string match
    pub fn matches(&self, text: &str) -> bool {
        if self.too_long {
            return false;
        }
        let text: Vec<char> = text.chars().map(fold).collect();
        self.match_at(&text, true)
    }

    /// Character offset of the first position where the whole pattern
    /// matches, without requiring the match to run to the end of `text`
    pub fn search(&self, text: &str) -> Option<usize> {
        if self.too_long {
            return None;
        }
        let text: Vec<char> = text.chars().map(fold).collect();
        (0..=text.len()).find(|&start| self.match_at(&text[start..], false))
    }

    /// Greedy scan that remembers the most recent `*` and retries from one
    /// character further along the input on a mismatch.
    fn match_at(&self, text: &[char], whole: bool) -> bool {
        let pattern = &self.tokens;
        let mut pi = 0;
        let mut ti = 0;
        // (pattern index of the star, input index it currently resumes at)
        let mut star: Option<(usize, usize)> = None;

        loop {
            if pi == pattern.len() {
                if !whole || ti == text.len() {
                    return true;
                }
            } else {
                match pattern[pi] {
                    PatternToken::Star => {
                        star = Some((pi, ti));
                        pi += 1;
                        continue;
                    }
                    PatternToken::Any if ti < text.len() => {
                        pi += 1;
                        ti += 1;
                        continue;
                    }
                    PatternToken::Literal(c) if ti < text.len() && text[ti] == c => {
                        pi += 1;
                        ti += 1;
                        continue;
                    }
                    _ => {}
                }
            }

            match star {
                Some((star_pi, star_ti)) if star_ti < text.len() => {
                    star = Some((star_pi, star_ti + 1));
                    pi = star_pi + 1;
                    ti = star_ti + 1;
                }
                _ => return false,
            }
        }
    }
}
