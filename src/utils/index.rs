/// Format a count with its noun, e.g. `1 workout`, `3 workouts`.
pub fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(0, "workout"), "0 workouts");
        assert_eq!(pluralize(1, "workout"), "1 workout");
        assert_eq!(pluralize(12, "workout"), "12 workouts");
    }
}
