use crate::scan::error::{ErrorKind, Result};
use exn::ResultExt;
use regex::{Regex, RegexBuilder};

/// Case-insensitive file-name globs (`*` and `?` wildcards only).
#[derive(Clone, Debug)]
pub struct SkipPatterns {
    patterns: Vec<Regex>,
}

impl SkipPatterns {
    pub fn new<S: AsRef<str>>(globs: impl IntoIterator<Item = S>) -> Result<Self> {
        let patterns = globs
            .into_iter()
            .map(|glob| {
                let glob = glob.as_ref();
                RegexBuilder::new(&glob_to_regex(glob))
                    .case_insensitive(true)
                    .build()
                    .or_raise(|| ErrorKind::Pattern(glob.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn empty() -> Self {
        Self { patterns: Vec::new() }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(name))
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut regex = String::with_capacity(glob.len() + 8);
    regex.push('^');
    for c in glob.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            c => regex.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    regex.push('$');
    regex
}
