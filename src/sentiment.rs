/// A sentiment code as stored with each record.
pub type Code = i64;

/// The display form of a sentiment code: a label and a CSS class
/// hinting how to present it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sentiment {
    pub label: &'static str,
    pub hint: &'static str,
}

impl Sentiment {
    const fn new(label: &'static str, hint: &'static str) -> Self {
        Sentiment { label, hint }
    }
}

/// Returned for any code outside the lexicon.
pub const UNKNOWN: Sentiment = Sentiment::new("Unknown", "text-gray-400");

const LEXICON: [(Code, Sentiment); 5] = [
    (1, Sentiment::new("Anxiety", "text-red-600")),
    (2, Sentiment::new("Sadness", "text-blue-600")),
    (3, Sentiment::new("Calm", "text-gray-600")),
    (4, Sentiment::new("Joy", "text-green-600")),
    (5, Sentiment::new("Excited", "text-yellow-600")),
];

/// Looks up the label and presentation hint for `code`.
///
/// ```
/// use vlog_backend::sentiment::{resolve, UNKNOWN};
/// assert_eq!(resolve(4).label, "Joy");
/// assert_eq!(resolve(9), UNKNOWN);
/// ```
pub fn resolve(code: Code) -> Sentiment {
    LEXICON
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| *s)
        .unwrap_or(UNKNOWN)
}
