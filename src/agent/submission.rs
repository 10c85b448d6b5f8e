//! Submission types — what an inbound message asks the bot to do.

/// Parses message content into Submission types.
pub struct SubmissionParser;

impl SubmissionParser {
    /// Parse message content into a Submission.
    ///
    /// Commands are matched case-insensitively on the trimmed text; anything
    /// else is handed to the order parser untouched.
    pub fn parse(content: &str) -> Submission {
        let lower = content.trim().to_lowercase();

        match lower.as_str() {
            "orders" => Submission::ExportOrders,
            "/help" | "/?" => Submission::Help,
            "/quit" | "/exit" => Submission::Quit,
            _ => Submission::OrderText {
                content: content.to_string(),
            },
        }
    }
}

/// A submission to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Free text that may contain an order block.
    OrderText { content: String },

    /// Export everything collected so far as CSV.
    ExportOrders,

    /// Show the expected message format.
    Help,

    /// Stop the bot loop.
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_export_command() {
        for input in ["orders", "Orders", "ORDERS", "  orders\n"] {
            assert_eq!(
                SubmissionParser::parse(input),
                Submission::ExportOrders,
                "Expected export for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_parser_export_must_be_whole_message() {
        let submission = SubmissionParser::parse("orders please");
        assert!(matches!(submission, Submission::OrderText { .. }));
    }

    #[test]
    fn test_parser_help() {
        assert_eq!(SubmissionParser::parse("/help"), Submission::Help);
        assert_eq!(SubmissionParser::parse("/?"), Submission::Help);
        assert_eq!(SubmissionParser::parse("/HELP"), Submission::Help);
    }

    #[test]
    fn test_parser_quit() {
        assert_eq!(SubmissionParser::parse("/quit"), Submission::Quit);
        assert_eq!(SubmissionParser::parse("/exit"), Submission::Quit);
        assert_eq!(SubmissionParser::parse("/QUIT"), Submission::Quit);
    }

    #[test]
    fn test_parser_order_text_keeps_original_content() {
        let text = "1.hét:\nHétfő: pizza\n";
        assert_eq!(
            SubmissionParser::parse(text),
            Submission::OrderText {
                content: text.to_string()
            }
        );
    }
}
