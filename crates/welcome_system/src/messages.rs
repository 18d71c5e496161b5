//! Placeholder substitution for operator-configured messages.

/// Values that may appear in a message template. Unset values leave their
/// placeholder untouched.
#[derive(Debug, Default, Clone)]
pub struct Placeholders<'a> {
    pub player_name: Option<&'a str>,
    pub target_name: Option<&'a str>,
    pub seconds: Option<u64>,
    pub reward_amount: Option<f64>,
    pub reward_display: Option<&'a str>,
    pub unique_join_count: Option<u64>,
}

impl<'a> Placeholders<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player(mut self, name: &'a str) -> Self {
        self.player_name = Some(name);
        self
    }

    pub fn target(mut self, name: &'a str) -> Self {
        self.target_name = Some(name);
        self
    }

    pub fn seconds(mut self, seconds: u64) -> Self {
        self.seconds = Some(seconds);
        self
    }

    pub fn reward(mut self, amount: f64, display: &'a str) -> Self {
        self.reward_amount = Some(amount);
        self.reward_display = Some(display);
        self
    }

    pub fn unique_join_count(mut self, count: u64) -> Self {
        self.unique_join_count = Some(count);
        self
    }

    /// Substitutes every known placeholder in `template`.
    pub fn render(&self, template: &str) -> String {
        let mut out = template.to_string();
        if let Some(name) = self.player_name {
            out = out.replace("%player_name%", name);
        }
        if let Some(name) = self.target_name {
            out = out.replace("%target_name%", name);
        }
        if let Some(seconds) = self.seconds {
            out = out.replace("%seconds%", &seconds.to_string());
        }
        if let Some(amount) = self.reward_amount {
            out = out.replace("%reward_amount%", &format_amount(amount));
        }
        if let Some(display) = self.reward_display {
            out = out.replace("%reward_display%", display);
        }
        if let Some(count) = self.unique_join_count {
            out = out.replace("%unique_join_count%", &count.to_string());
        }
        out
    }
}

/// Formats a reward amount: integral amounts print without a fraction.
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{}", amount as i64)
    } else {
        amount.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_welcome_and_success() {
        let welcome = Placeholders::new()
            .player("Bob")
            .target("Alice")
            .render("Welcome to the server, %target_name%! Welcomed by %player_name%");
        assert_eq!(welcome, "Welcome to the server, Alice! Welcomed by Bob");

        let success = Placeholders::new()
            .reward(100.0, "dollars")
            .render("You received %reward_amount% %reward_display%!");
        assert_eq!(success, "You received 100 dollars!");
    }

    #[test]
    fn test_unset_placeholders_are_kept() {
        let rendered = Placeholders::new()
            .seconds(59)
            .render("Wait %seconds%s, %player_name%");
        assert_eq!(rendered, "Wait 59s, %player_name%");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(5.0), "5");
        assert_eq!(format_amount(2.5), "2.5");
    }
}
