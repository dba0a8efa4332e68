//! Representative label from member descriptions

/// Longest common prefix of all strings (case-sensitive, char aligned)
pub fn common_prefix<'a>(descriptions: &[&'a str]) -> &'a str {
    let Some((first, rest)) = descriptions.split_first() else {
        return "";
    };

    let mut end = first.len();
    for other in rest {
        end = first[..end]
            .chars()
            .zip(other.chars())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a.len_utf8())
            .sum();
        if end == 0 {
            break;
        }
    }

    &first[..end]
}

/// Trimmed common prefix, or None when it is shorter than `min_len` chars
pub fn description_label(descriptions: &[&str], min_len: usize) -> Option<String> {
    let prefix = common_prefix(descriptions).trim();
    if prefix.chars().count() < min_len {
        return None;
    }
    Some(prefix.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_prefix() {
        assert_eq!(
            common_prefix(&["NETFLIX.COM 1234", "NETFLIX.COM 5678"]),
            "NETFLIX.COM "
        );
        assert_eq!(common_prefix(&["abc", "abd", "ab"]), "ab");
        assert_eq!(common_prefix(&["same", "same"]), "same");
        assert_eq!(common_prefix(&["x", "y"]), "");
        assert_eq!(common_prefix(&[]), "");
    }

    #[test]
    fn test_common_prefix_is_case_sensitive() {
        assert_eq!(common_prefix(&["Netflix", "NETFLIX"]), "N");
    }

    #[test]
    fn test_common_prefix_multibyte() {
        assert_eq!(common_prefix(&["Café Noir", "Café Crème"]), "Café ");
        assert_eq!(common_prefix(&["über", "übel"]), "übe");
    }

    #[test]
    fn test_label_trimmed() {
        assert_eq!(
            description_label(&["  Gym membership Jan", "  Gym membership Feb"], 3),
            Some("Gym membership".to_string())
        );
    }

    #[test]
    fn test_label_dropped_when_short() {
        assert_eq!(description_label(&["AB 1", "AB 2"], 3), None);
        assert_eq!(description_label(&["", ""], 3), None);
        assert_eq!(description_label(&["Rent", "Water"], 3), None);
        assert_eq!(
            description_label(&["Gas", "Gas"], 3),
            Some("Gas".to_string())
        );
    }
}
