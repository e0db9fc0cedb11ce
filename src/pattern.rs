use regex::{Regex, RegexBuilder};

/// Escapes `$` and `.` so inner-class and package separators match
/// literally; everything else keeps its regex meaning.
pub fn escape_class_pattern(pattern: &str) -> String {
    pattern.replace('$', r"\$").replace('.', r"\.")
}

/// Case-insensitive class-name filter applied to both the smali
/// (`Lcom/a/B;`) and dotted (`com.a.B`) forms.
#[derive(Debug, Clone)]
pub struct ClassPattern {
    regex: Regex,
}

impl ClassPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(&escape_class_pattern(pattern))
            .case_insensitive(true)
            .build()?;
        Ok(Self { regex })
    }

    pub fn matches(&self, raw_name: &str, dot_name: &str) -> bool {
        self.regex.is_match(raw_name) || self.regex.is_match(dot_name)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}
