//! The query schema:
//!
//! ```graphql
//! type Query { search(term: String!, first: Int): [SearchResult] }
//! type SearchResult { id: ID!, names: [String!]!, tags: [String!]!, locations: [Location!]! }
//! type Location { city: String, country: String, content: String! }
//! ```

use serde_json::{Number, Value as Json};

use super::parser::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    String,
    Int,
    Float,
    Boolean,
    Id,
}

impl Scalar {
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::Boolean => "Boolean",
            Self::Id => "ID",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "String" => Some(Self::String),
            "Int" => Some(Self::Int),
            "Float" => Some(Self::Float),
            "Boolean" => Some(Self::Boolean),
            "ID" => Some(Self::Id),
            _ => None,
        }
    }

    /// Coerces a query literal. `None` if the literal is not valid for this scalar.
    pub fn coerce_literal(self, value: &Value) -> Option<Json> {
        match (self, value) {
            (Self::String, Value::String(s)) => Some(Json::String(s.clone())),
            (Self::Id, Value::String(s)) => Some(Json::String(s.clone())),
            (Self::Id, Value::Int(n)) => Some(Json::String(n.to_string())),
            (Self::Int, Value::Int(n)) => i32::try_from(*n).ok().map(Json::from),
            (Self::Float, Value::Int(n)) => Number::from_f64(*n as f64).map(Json::Number),
            (Self::Float, Value::Float(n)) => Number::from_f64(*n).map(Json::Number),
            (Self::Boolean, Value::Boolean(b)) => Some(Json::Bool(*b)),
            _ => None,
        }
    }

    /// Coerces a JSON variable value. `None` if the value is not valid for this scalar.
    pub fn coerce_json(self, value: &Json) -> Option<Json> {
        match (self, value) {
            (Self::String, Json::String(_)) => Some(value.clone()),
            (Self::Id, Json::String(_)) => Some(value.clone()),
            (Self::Id, Json::Number(n)) => n.as_i64().map(|n| Json::String(n.to_string())),
            (Self::Int, Json::Number(n)) => n
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(Json::from),
            (Self::Float, Json::Number(_)) => Some(value.clone()),
            (Self::Boolean, Json::Bool(_)) => Some(value.clone()),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum Output {
    Scalar,
    Object(&'static ObjectType),
}

#[derive(Debug)]
pub struct ArgumentDef {
    pub name: &'static str,
    pub scalar: Scalar,
    pub required: bool,
}

impl ArgumentDef {
    pub fn type_name(&self) -> String {
        if self.required {
            format!("{}!", self.scalar.name())
        } else {
            self.scalar.name().to_string()
        }
    }
}

#[derive(Debug)]
pub struct FieldDef {
    pub name: &'static str,
    /// Declared type as written in the schema, e.g. `[String!]!`
    pub type_name: &'static str,
    pub output: Output,
    pub arguments: &'static [ArgumentDef],
}

impl FieldDef {
    pub fn argument(&self, name: &str) -> Option<&'static ArgumentDef> {
        self.arguments.iter().find(|arg| arg.name == name)
    }
}

#[derive(Debug)]
pub struct ObjectType {
    pub name: &'static str,
    pub fields: &'static [FieldDef],
}

impl ObjectType {
    pub fn field(&'static self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Available on every object type.
pub static TYPENAME: FieldDef = FieldDef {
    name: "__typename",
    type_name: "String!",
    output: Output::Scalar,
    arguments: &[],
};

pub static LOCATION: ObjectType = ObjectType {
    name: "Location",
    fields: &[
        FieldDef {
            name: "city",
            type_name: "String",
            output: Output::Scalar,
            arguments: &[],
        },
        FieldDef {
            name: "country",
            type_name: "String",
            output: Output::Scalar,
            arguments: &[],
        },
        FieldDef {
            name: "content",
            type_name: "String!",
            output: Output::Scalar,
            arguments: &[],
        },
    ],
};

pub static SEARCH_RESULT: ObjectType = ObjectType {
    name: "SearchResult",
    fields: &[
        FieldDef {
            name: "id",
            type_name: "ID!",
            output: Output::Scalar,
            arguments: &[],
        },
        FieldDef {
            name: "names",
            type_name: "[String!]!",
            output: Output::Scalar,
            arguments: &[],
        },
        FieldDef {
            name: "tags",
            type_name: "[String!]!",
            output: Output::Scalar,
            arguments: &[],
        },
        FieldDef {
            name: "locations",
            type_name: "[Location!]!",
            output: Output::Object(&LOCATION),
            arguments: &[],
        },
    ],
};

pub static QUERY: ObjectType = ObjectType {
    name: "Query",
    fields: &[FieldDef {
        name: "search",
        type_name: "[SearchResult]",
        output: Output::Object(&SEARCH_RESULT),
        arguments: &[
            ArgumentDef {
                name: "term",
                scalar: Scalar::String,
                required: true,
            },
            ArgumentDef {
                name: "first",
                scalar: Scalar::Int,
                required: false,
            },
        ],
    }],
};

/// Whether `name` is an object type of this schema.
pub fn is_object_type(name: &str) -> bool {
    [&QUERY, &SEARCH_RESULT, &LOCATION]
        .iter()
        .any(|object| object.name == name)
}
