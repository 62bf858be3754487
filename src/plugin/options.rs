//! Module options: named string values with an integer reading.

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOption {
    name: String,
    content: String,
}

impl ModuleOption {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// Leading integer of the content, e.g. `"3 days"` reads as 3.
    pub fn as_int(&self) -> Option<i64> {
        let text = self.content.trim_start();
        let end = text
            .char_indices()
            .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        text[..end].parse().ok()
    }
}

/// Options passed to one module. Names may repeat; lookups return the
/// first match.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleOptions {
    options: Vec<ModuleOption>,
}

impl ModuleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn option_new(&mut self, name: &str, content: &str) {
        self.options.push(ModuleOption {
            name: name.to_string(),
            content: content.to_string(),
        });
    }

    pub fn option_find(&self, name: &str) -> Option<&ModuleOption> {
        self.options.iter().find(|o| o.name == name)
    }

    /// Every option called `name`, in insertion order.
    pub fn option_find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ModuleOption> + 'a {
        self.options.iter().filter(move |o| o.name == name)
    }

    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.option_find(name).map(ModuleOption::as_str)
    }

    pub fn option_int(&self, name: &str) -> Option<i64> {
        self.option_find(name).and_then(ModuleOption::as_int)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let mut opts = ModuleOptions::new();
        opts.option_new("weight", "50");
        opts.option_new("day", "monday");
        opts.option_new("day", "friday");

        assert_eq!(opts.option_int("weight"), Some(50));
        assert_eq!(opts.option_str("day"), Some("monday"));
        assert_eq!(opts.option_int("day"), None);
        assert_eq!(opts.option_find_all("day").count(), 2);
        assert!(opts.option_find("missing").is_none());
        assert_eq!(opts.len(), 3);
    }

    #[test]
    fn test_leading_integer() {
        let mut opts = ModuleOptions::new();
        opts.option_new("a", "  -3 periods");
        opts.option_new("b", "+7");
        opts.option_new("c", "-");
        assert_eq!(opts.option_int("a"), Some(-3));
        assert_eq!(opts.option_int("b"), Some(7));
        assert_eq!(opts.option_int("c"), None);
    }
}
