//! Locators for the target site's login page and pin composer.
//!
//! Inherently fragile and best-effort: the site ships no stable
//! automation contract, so anything here can break on a layout change.
//! Where a control is known to render differently across variants, an
//! ordered alternative list is tried before the default locator.

pub const LOGIN_EMAIL: &str = r#"input[id="email"]"#;
pub const LOGIN_PASSWORD: &str = r#"input[id="password"]"#;
pub const LOGIN_SUBMIT: &str = r#"button[type="submit"]"#;

/// Probed while waiting for the post-login redirect; a hit means the
/// site rejected the credentials.
pub const LOGIN_ERROR_ALTERNATIVES: &[&str] = &[
    r#"[data-test-id="emailField-error"]"#,
    r#"[data-test-id="passwordField-error"]"#,
];

pub const TITLE_FIELD: &str = r#"textarea[placeholder="Add your title"]"#;
pub const DESCRIPTION_FIELD: &str = r#"div[data-block="true"]"#;
pub const FILE_INPUT: &str = r#"input[aria-label="File upload"]"#;

/// Board-dropdown openers, most common variant first.
pub const BOARD_DROPDOWN_ALTERNATIVES: &[&str] = &[
    r#"div[data-test-id="board-dropdown-placeholder"]"#,
    r#"div[data-test-id="board-dropdown-select-button"]"#,
    r#"[aria-label="Select a board"]"#,
    r#"[data-test-id="board-selection-button"]"#,
];
pub const BOARD_DROPDOWN_DEFAULT: &str = r#"div[data-test-id="board-dropdown-placeholder"]"#;

/// Board names render as `div[title]` entries in the open dropdown; the
/// "Create board" action is excluded from the candidate list.
pub const BOARD_TITLES_JS: &str = "Array.from(document.querySelectorAll('div[title]'))\
    .map(el => el.getAttribute('title'))\
    .filter(t => t && t !== 'Create board')";

pub const CREATE_BOARD_ITEM: &str = r#"div[title="Create board"]"#;
pub const BOARD_NAME_ALTERNATIVES: &[&str] =
    &[r#"input[aria-invalid="false"]"#, r#"input[id="boardName"]"#];
pub const BOARD_FORM_SUBMIT: &str = r#"button[data-test-id="board-form-submit-button"]"#;

pub const SAVE_ALTERNATIVES: &[&str] = &[
    r#"button[data-test-id="board-dropdown-save-button"]"#,
    r#"button[data-test-id="pin-draft-save-button"]"#,
];
pub const SAVE_DEFAULT: &str = r#"button[data-test-id="pin-draft-save-button"]"#;

/// Locator for a board entry by its exact title.
pub fn board_item(title: &str) -> String {
    let escaped = title.replace('\\', "\\\\").replace('"', "\\\"");
    format!(r#"div[title="{escaped}"]"#)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_item_plain_title() {
        assert_eq!(board_item("Home Decor"), r#"div[title="Home Decor"]"#);
    }

    #[test]
    fn test_board_item_escapes_quotes() {
        assert_eq!(
            board_item(r#"Say "Cheese""#),
            r#"div[title="Say \"Cheese\""]"#
        );
    }

    #[test]
    fn test_board_item_escapes_backslashes() {
        assert_eq!(board_item(r"a\b"), r#"div[title="a\\b"]"#);
    }

    #[test]
    fn test_dropdown_default_is_an_alternative() {
        assert!(BOARD_DROPDOWN_ALTERNATIVES.contains(&BOARD_DROPDOWN_DEFAULT));
    }
}
