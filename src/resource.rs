use crate::schema::{FieldSpec, FieldType, FilterKind, FilterSpec, ResourceSchema};

/// The schema for the `tracks` collection.
pub static TRACKS: ResourceSchema = ResourceSchema {
    name: "tracks",
    sort_field: "naam",
    fields: &[
        FieldSpec {
            name: "naam",
            ty: FieldType::Str,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "bpm",
            ty: FieldType::Int,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "duur",
            ty: FieldType::Int,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "jaar",
            ty: FieldType::Int,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "artiesten",
            ty: FieldType::StrList,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "genres",
            ty: FieldType::StrList,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "spotify_url",
            ty: FieldType::Str,
            required: false,
            default: Some(""),
        },
    ],
    filters: &[
        FilterSpec {
            param: "naam",
            field: "naam",
            kind: FilterKind::Substring,
        },
        FilterSpec {
            param: "artiest",
            field: "artiesten",
            kind: FilterKind::ListSubstring,
        },
        FilterSpec {
            param: "genre",
            field: "genres",
            kind: FilterKind::ListSubstring,
        },
        FilterSpec {
            param: "jaar",
            field: "jaar",
            kind: FilterKind::IntEquals,
        },
    ],
};

/// The schema for the `playlists` collection.
pub static PLAYLISTS: ResourceSchema = ResourceSchema {
    name: "playlists",
    sort_field: "naam",
    fields: &[
        FieldSpec {
            name: "naam",
            ty: FieldType::Str,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "beschrijving",
            ty: FieldType::Str,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "author",
            ty: FieldType::Str,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "visibility",
            ty: FieldType::Enum(&["public", "private"]),
            required: true,
            default: None,
        },
        FieldSpec {
            name: "spotify_url",
            ty: FieldType::Str,
            required: false,
            default: Some(""),
        },
    ],
    filters: &[
        FilterSpec {
            param: "naam",
            field: "naam",
            kind: FilterKind::Substring,
        },
        FilterSpec {
            param: "author",
            field: "author",
            kind: FilterKind::Substring,
        },
        FilterSpec {
            param: "visibility",
            field: "visibility",
            kind: FilterKind::Equals,
        },
    ],
};

/// Selects one of the two served resources.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceKind {
    Tracks,
    Playlists,
}

impl ResourceKind {
    pub fn schema(self) -> &'static ResourceSchema {
        match self {
            ResourceKind::Tracks => &TRACKS,
            ResourceKind::Playlists => &PLAYLISTS,
        }
    }

    /// The path segment under `/api`, which doubles as the collection
    /// name in storage.
    pub fn path(self) -> &'static str {
        self.schema().name
    }
}
