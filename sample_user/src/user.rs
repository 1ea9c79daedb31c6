//! User record and the narrower shapes each operation works with.

use shape_crud::{ConfigError, Field, FieldType, Shape};

/// Full stored record; backs the `p_user` table.
pub fn user() -> Result<Shape, ConfigError> {
    Shape::new(
        "User",
        vec![
            Field::id("id", FieldType::Int64).json("user_id"),
            Field::new("flags", FieldType::Int64),
            Field::new("name", FieldType::String).tag("crud", "lenmin:0 lenmax:50"),
            Field::new("email", FieldType::String).tag("crud", "req"),
            Field::new("password", FieldType::String).tag("crud", "hidden password"),
            Field::new("email_activation_key", FieldType::String).tag("crud", "hidden"),
            Field::new("created_at", FieldType::Int64),
            Field::new("created_by", FieldType::Int64),
            Field::new("last_modified_at", FieldType::Int64),
            Field::new("last_modified_by", FieldType::Int64),
        ],
    )
}

pub fn user_create() -> Result<Shape, ConfigError> {
    Shape::new(
        "User_Create",
        vec![
            Field::id("id", FieldType::Int64).json("user_id"),
            Field::new("name", FieldType::String).tag("crud", "req lenmin:2 lenmax:50"),
            Field::new("email", FieldType::String).tag("crud", "req"),
            Field::new("password", FieldType::String).tag("crud", "req password"),
        ],
    )
}

pub fn user_update() -> Result<Shape, ConfigError> {
    Shape::new(
        "User_Update",
        vec![
            Field::id("id", FieldType::Int64).json("user_id"),
            Field::new("name", FieldType::String).tag("crud", "req lenmin:2 lenmax:50"),
            Field::new("email", FieldType::String).tag("crud", "req"),
        ],
    )
}

pub fn user_update_password() -> Result<Shape, ConfigError> {
    Shape::new(
        "User_UpdatePassword",
        vec![
            Field::id("id", FieldType::Int64).json("user_id"),
            Field::new("password", FieldType::String).tag("crud", "req password"),
        ],
    )
}

/// Public projection used for read and list.
pub fn user_list() -> Result<Shape, ConfigError> {
    Shape::new(
        "User_List",
        vec![
            Field::id("id", FieldType::Int64).json("user_id"),
            Field::new("name", FieldType::String),
        ],
    )
}
