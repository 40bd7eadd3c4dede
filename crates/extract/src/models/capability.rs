use crate::consts;
use derive_more::Display;

/// What trawl can do with a file, decided from its name alone.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Plain text, source code, structured data and markup.
    #[display("text")]
    TextLike,
    #[display("document")]
    Document,
    #[display("image")]
    Image,
    /// An archive whose members are fed back into the pipeline.
    #[display("container")]
    Container,
    /// No decoder exists; the file is skipped.
    #[display("unknown")]
    Unknown,
}

impl Capability {
    /// Look up a single, lower-cased extension without its leading dot.
    ///
    /// Containers are matched on whole suffixes elsewhere, so this never
    /// returns [`Capability::Container`].
    pub fn from_extension(extension: &str) -> Self {
        let extension = extension.trim_start_matches('.');
        if consts::TEXT_EXTENSIONS.contains(&extension) {
            Capability::TextLike
        } else if consts::DOCUMENT_EXTENSIONS.contains(&extension) {
            Capability::Document
        } else if consts::IMAGE_EXTENSIONS.contains(&extension) {
            Capability::Image
        } else {
            Capability::Unknown
        }
    }

    /// Every extension with a leaf decoder, with its leading dot.
    pub fn known_extensions() -> impl Iterator<Item = String> {
        consts::TEXT_EXTENSIONS
            .iter()
            .chain(consts::DOCUMENT_EXTENSIONS)
            .chain(consts::IMAGE_EXTENSIONS)
            .map(|ext| format!(".{ext}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("txt", Capability::TextLike)]
    #[case(".json", Capability::TextLike)]
    #[case("md", Capability::TextLike)]
    #[case("pdf", Capability::Document)]
    #[case("jpeg", Capability::Image)]
    #[case("xyz", Capability::Unknown)]
    #[case("", Capability::Unknown)]
    fn maps_extension(#[case] extension: &str, #[case] expected: Capability) {
        assert_eq!(Capability::from_extension(extension), expected);
    }

    #[test]
    fn known_extensions_are_dotted() {
        assert!(Capability::known_extensions().all(|ext| ext.starts_with('.')));
        assert!(Capability::known_extensions().any(|ext| ext == ".png"));
    }
}
