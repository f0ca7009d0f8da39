//! Archive file naming for downloaded media.

use tgmed_core::records::channel_dir_name;

use crate::types::{MediaInfo, MediaKind};

/// Picks the archive file name for one media attachment.
///
/// A declared `file_name` wins (stripped to its final path component so
/// a hostile name cannot escape the partition directory). Otherwise the
/// name is synthesized as `<channel_dir>_<message_id>.<ext>`, with the
/// extension taken from the MIME subtype; photos fall back to `.jpg`,
/// documents to `.bin`.
pub fn media_file_name(channel_title: &str, message_id: i64, media: &MediaInfo) -> String {
    if let Some(declared) = media
        .file_name
        .as_deref()
        .map(strip_path_components)
        .filter(|name| !name.is_empty())
    {
        return declared.to_owned();
    }

    let extension = media
        .mime_type
        .as_deref()
        .and_then(|mime| mime.rsplit('/').next())
        .filter(|subtype| !subtype.is_empty())
        .map_or_else(
            || match media.kind {
                MediaKind::Photo => "jpg".to_owned(),
                MediaKind::Document => "bin".to_owned(),
            },
            str::to_owned,
        );

    format!(
        "{}_{message_id}.{extension}",
        channel_dir_name(channel_title)
    )
}

fn strip_path_components(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(kind: MediaKind, file_name: Option<&str>, mime_type: Option<&str>) -> MediaInfo {
        MediaInfo {
            kind,
            file_name: file_name.map(str::to_owned),
            mime_type: mime_type.map(str::to_owned),
        }
    }

    #[test]
    fn declared_file_name_wins() {
        let info = media(MediaKind::Document, Some("price_list.pdf"), Some("application/pdf"));
        assert_eq!(media_file_name("CheMed", 9, &info), "price_list.pdf");
    }

    #[test]
    fn declared_name_is_stripped_to_its_final_component() {
        let info = media(MediaKind::Document, Some("../../etc/passwd"), None);
        assert_eq!(media_file_name("CheMed", 9, &info), "passwd");
    }

    #[test]
    fn photo_name_is_synthesized_from_channel_and_message() {
        let info = media(MediaKind::Photo, None, Some("image/jpeg"));
        assert_eq!(
            media_file_name("Lobelia Cosmetics", 412, &info),
            "Lobelia_Cosmetics_412.jpeg"
        );
    }

    #[test]
    fn photo_without_mime_defaults_to_jpg() {
        let info = media(MediaKind::Photo, None, None);
        assert_eq!(media_file_name("CheMed", 7, &info), "CheMed_7.jpg");
    }

    #[test]
    fn document_without_mime_defaults_to_bin() {
        let info = media(MediaKind::Document, None, None);
        assert_eq!(media_file_name("CheMed", 7, &info), "CheMed_7.bin");
    }
}
