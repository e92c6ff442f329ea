use serde_json::Value;

use crate::errors::BackendError;
use crate::record::Record;

/// The type constraint a field's value must satisfy.
#[derive(Debug)]
pub enum FieldType {
    Int,
    Str,
    /// A non-empty array of strings.
    StrList,
    /// A string drawn from a fixed set of values.
    Enum(&'static [&'static str]),
}

/// One field of a resource schema, in declared validation order.
#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    /// Applied when an optional field is absent from a create or
    /// replace body.
    pub default: Option<&'static str>,
}

/// How a list query parameter matches against a record field.
#[derive(Debug)]
pub enum FilterKind {
    /// Case-insensitive substring match on a string field.
    Substring,
    /// Case-insensitive substring match against any element of a
    /// string-array field.
    ListSubstring,
    /// Integer equality. A parameter that does not parse as an
    /// integer matches nothing.
    IntEquals,
    /// Case-insensitive equality on a string field.
    Equals,
}

/// Maps one query parameter onto a record field.
#[derive(Debug)]
pub struct FilterSpec {
    pub param: &'static str,
    pub field: &'static str,
    pub kind: FilterKind,
}

/// The declarative description of one resource type: everything the
/// generic engine needs to validate, filter, and sort its records.
#[derive(Debug)]
pub struct ResourceSchema {
    /// The collection name, also the path segment under `/api`.
    pub name: &'static str,
    /// The display-name field used for sorted reads.
    pub sort_field: &'static str,
    pub fields: &'static [FieldSpec],
    pub filters: &'static [FilterSpec],
}

/// The operation a body is being validated for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    Create,
    Replace,
    Patch,
}

/// Checks a candidate body against the schema for the given
/// operation. Fields are validated in declared order and only the
/// first violated constraint is reported.
pub fn validate(
    schema: &ResourceSchema,
    operation: Operation,
    body: &Record,
) -> Result<(), BackendError> {
    match operation {
        Operation::Create => {
            if body.contains_key("id") {
                return Err(BackendError::validation(
                    "id is assigned by the server and must not be supplied",
                ));
            }
        }
        Operation::Replace => match body.get("id") {
            None => return Err(BackendError::validation("id is required")),
            Some(value) if value.as_i64().is_none() => {
                return Err(BackendError::validation("id must be an integer"));
            }
            Some(_) => {}
        },
        Operation::Patch => {}
    }

    for field in schema.fields {
        match body.get(field.name) {
            Some(value) => check_value(field, value)?,
            None => {
                if field.required && operation != Operation::Patch {
                    return Err(BackendError::validation(format!(
                        "{} is required",
                        field.name
                    )));
                }
            }
        }
    }

    Ok(())
}

fn check_value(field: &FieldSpec, value: &Value) -> Result<(), BackendError> {
    let ok = match &field.ty {
        FieldType::Int => value.as_i64().is_some(),
        FieldType::Str => value.is_string(),
        FieldType::StrList => value
            .as_array()
            .map(|items| !items.is_empty() && items.iter().all(Value::is_string))
            .unwrap_or(false),
        FieldType::Enum(allowed) => value
            .as_str()
            .map(|s| allowed.contains(&s))
            .unwrap_or(false),
    };

    if ok {
        return Ok(());
    }

    Err(BackendError::validation(match &field.ty {
        FieldType::Int => format!("{} must be an integer", field.name),
        FieldType::Str => format!("{} must be a string", field.name),
        FieldType::StrList => format!("{} must be a non-empty array of strings", field.name),
        FieldType::Enum(allowed) => {
            format!("{} must be one of: {}", field.name, allowed.join(", "))
        }
    }))
}
