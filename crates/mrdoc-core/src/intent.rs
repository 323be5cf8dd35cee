/// Words that switch the conversation over to image identification
const IMAGE_KEYWORDS: [&str; 2] = ["image", "photo"];

/// Routing decision for one line of user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Forward the question to the conversational responder
    TextQuery,
    /// Open the upload control instead of answering
    ImageRequest,
}

/// Route user input by case-insensitive substring match on the image keywords.
/// "photos", "imagery" and "PhotoID" all count as image requests.
pub fn classify_intent(text: &str) -> Intent {
    let lower = text.to_lowercase();
    if IMAGE_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
        Intent::ImageRequest
    } else {
        Intent::TextQuery
    }
}
