//! # Utility Functions Module
//!
//! Small helpers for building and printing encoder argument lists.

/// Builds an argument vector from mixed `Display` items.
///
/// ```rust,ignore
/// let args = args!["-map", "[v]", "-preset", preset];
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        vec![$($item.to_string()),*]
    };
}

/// Join arguments into one line for logs, quoting the ones a shell would split
pub fn shell_join<'a, I>(args: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    args.into_iter()
        .map(|arg| {
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '"' || c == ';') {
                format!("\"{}\"", arg.replace('"', "\\\""))
            } else {
                arg.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
