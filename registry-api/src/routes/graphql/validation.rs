//! Checks a parsed document against the schema and resolves its arguments.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use serde_json::{Map, Number, Value as Json};

use super::error::GraphqlError;
use super::parser::{Document, Field, Operation, OperationKind, Pos, TypeRef, Value};
use super::schema::{is_object_type, ArgumentDef, FieldDef, ObjectType, Output, Scalar, QUERY, TYPENAME};

/// A field ready to execute: schema definition found, arguments coerced.
#[derive(Debug)]
pub struct PlannedField {
    pub key: String,
    pub def: &'static FieldDef,
    pub arguments: Map<String, Json>,
    pub selections: Vec<PlannedField>,
    pub pos: Pos,
}

impl PlannedField {
    pub fn name(&self) -> &'static str {
        self.def.name
    }
}

/// Selects the operation to run and validates it.
///
/// Returns the root fields of the query, or every validation error found.
pub fn validate(
    document: &Document,
    operation_name: Option<&str>,
    variables: &Map<String, Json>,
) -> Result<Vec<PlannedField>, Vec<GraphqlError>> {
    let operation = select_operation(document, operation_name).map_err(|err| vec![err])?;
    match operation.kind {
        OperationKind::Query => {}
        OperationKind::Mutation => {
            return Err(vec![GraphqlError::new(
                "Schema is not configured for mutations",
            )
            .at(operation.pos)])
        }
        OperationKind::Subscription => {
            return Err(vec![GraphqlError::new(
                "Schema is not configured for subscriptions",
            )
            .at(operation.pos)])
        }
    }

    let mut validator = Validator::new(operation);
    validator.coerce_variables(variables);
    let root_path = vec![validator.operation_path()];
    let fields = validator.select(&QUERY, &operation.selection_set, &root_path);
    validator.check_unused_variables();

    if validator.errors.is_empty() {
        Ok(fields)
    } else {
        Err(validator.errors)
    }
}

fn select_operation<'a>(
    document: &'a Document,
    operation_name: Option<&str>,
) -> Result<&'a Operation, GraphqlError> {
    match operation_name.filter(|name| !name.is_empty()) {
        Some(name) => document
            .operations
            .iter()
            .find(|operation| operation.name.as_deref() == Some(name))
            .ok_or_else(|| GraphqlError::new(format!("No operation named \"{name}\""))),
        None => match document.operations.as_slice() {
            [operation] => Ok(operation),
            _ => Err(GraphqlError::new("An operation name is required")),
        },
    }
}

struct Validator<'a> {
    operation: &'a Operation,
    /// Coerced variable values. `None` means not provided and no default.
    values: HashMap<&'a str, Option<Json>>,
    used: HashSet<String>,
    errors: Vec<GraphqlError>,
}

impl<'a> Validator<'a> {
    fn new(operation: &'a Operation) -> Self {
        Self {
            operation,
            values: HashMap::new(),
            used: HashSet::new(),
            errors: vec![],
        }
    }

    fn operation_description(&self) -> String {
        match &self.operation.name {
            Some(name) => name.clone(),
            None => "anonymous query".to_string(),
        }
    }

    fn operation_path(&self) -> String {
        match &self.operation.name {
            Some(name) => format!("query {name}"),
            None => "query".to_string(),
        }
    }

    fn error(&mut self, message: String, pos: Pos, path: Vec<String>) {
        self.errors
            .push(GraphqlError::new(message).at(pos).with_path(path));
    }

    fn coerce_variables(&mut self, provided: &Map<String, Json>) {
        let operation = self.operation;
        for definition in &operation.variables {
            let name = definition.name.as_str();
            let base = definition.var_type.base_name();
            if Scalar::from_name(base).is_none() {
                let message = if is_object_type(base) {
                    format!("{base} isn't a valid input type (on ${name})")
                } else {
                    format!("{base} isn't a defined input type (on ${name})")
                };
                self.error(message, definition.pos, vec![]);
                continue;
            }

            let default = definition.default_value.as_ref().map(literal_to_json);
            let value = provided.get(name).or(default.as_ref());
            match coerce_variable(&definition.var_type, value) {
                Some(value) => {
                    self.values.insert(name, value);
                }
                None => self.error(
                    format!(
                        "Variable ${name} of type {} was provided invalid value",
                        definition.var_type
                    ),
                    definition.pos,
                    vec![],
                ),
            }
        }
    }

    fn check_unused_variables(&mut self) {
        let operation = self.operation;
        for definition in &operation.variables {
            if !self.used.contains(&definition.name) {
                let message = format!(
                    "Variable ${} is declared by {} but not used",
                    definition.name,
                    self.operation_description()
                );
                self.error(message, definition.pos, vec![]);
            }
        }
    }

    fn select(
        &mut self,
        parent: &'static ObjectType,
        fields: &[Field],
        path: &[String],
    ) -> Vec<PlannedField> {
        let mut planned = vec![];
        for field in fields {
            let mut field_path = path.to_vec();
            field_path.push(field.response_key().to_string());

            let def = if field.name == TYPENAME.name {
                &TYPENAME
            } else if let Some(def) = parent.field(&field.name) {
                def
            } else {
                self.error(
                    format!(
                        "Field '{}' doesn't exist on type '{}'",
                        field.name, parent.name
                    ),
                    field.pos,
                    field_path,
                );
                continue;
            };

            let arguments = self.arguments(def, field, &field_path);
            let selections = match def.output {
                Output::Scalar => {
                    if !field.selection_set.is_empty() {
                        let selected = field
                            .selection_set
                            .iter()
                            .map(|f| f.response_key())
                            .join(", ");
                        self.error(
                            format!(
                                "Selections can't be made on scalars (field '{}' returns {} but has selections [{}])",
                                def.name, def.type_name, selected
                            ),
                            field.pos,
                            field_path,
                        );
                    }
                    vec![]
                }
                Output::Object(object) => {
                    if field.selection_set.is_empty() {
                        self.error(
                            format!(
                                "Field must have selections (field '{0}' returns {1} but has no selections. Did you mean '{0} {{ ... }}'?)",
                                def.name, object.name
                            ),
                            field.pos,
                            field_path,
                        );
                        vec![]
                    } else {
                        self.select(object, &field.selection_set, &field_path)
                    }
                }
            };

            planned.push(PlannedField {
                key: field.response_key().to_string(),
                def,
                arguments,
                selections,
                pos: field.pos,
            });
        }
        planned
    }

    fn arguments(&mut self, def: &'static FieldDef, field: &Field, path: &[String]) -> Map<String, Json> {
        let mut resolved = Map::new();
        for argument in &field.arguments {
            let Some(arg_def) = def.argument(&argument.name) else {
                self.error(
                    format!(
                        "Field '{}' doesn't accept argument '{}'",
                        def.name, argument.name
                    ),
                    argument.pos,
                    path.to_vec(),
                );
                continue;
            };

            let value = match &argument.value {
                Value::Variable(name) => self.variable_argument(arg_def, name, argument.pos, path),
                literal => self.literal_argument(def, arg_def, literal, argument.pos, path),
            };
            if let Some(value) = value {
                resolved.insert(arg_def.name.to_string(), value);
            }
        }

        let missing = def
            .arguments
            .iter()
            .filter(|arg| arg.required)
            .filter(|arg| !field.arguments.iter().any(|given| given.name == arg.name))
            .map(|arg| arg.name)
            .join(", ");
        if !missing.is_empty() {
            self.error(
                format!(
                    "Field '{}' is missing required arguments: {}",
                    def.name, missing
                ),
                field.pos,
                path.to_vec(),
            );
        }

        resolved
    }

    fn literal_argument(
        &mut self,
        def: &FieldDef,
        arg_def: &ArgumentDef,
        literal: &Value,
        pos: Pos,
        path: &[String],
    ) -> Option<Json> {
        let coerced = match literal {
            Value::Null if !arg_def.required => Some(Json::Null),
            literal => arg_def.scalar.coerce_literal(literal),
        };
        if coerced.is_none() {
            self.error(
                format!(
                    "Argument '{}' on Field '{}' has an invalid value ({}). Expected type '{}'.",
                    arg_def.name,
                    def.name,
                    literal,
                    arg_def.type_name()
                ),
                pos,
                path.to_vec(),
            );
        }
        coerced
    }

    fn variable_argument(
        &mut self,
        arg_def: &ArgumentDef,
        name: &str,
        pos: Pos,
        path: &[String],
    ) -> Option<Json> {
        self.used.insert(name.to_string());
        let operation = self.operation;
        let Some(definition) = operation.variables.iter().find(|v| v.name == name) else {
            let message = format!(
                "Variable ${name} is used by {} but not declared",
                self.operation_description()
            );
            self.error(message, pos, path.to_vec());
            return None;
        };

        let var_type = &definition.var_type;
        let nullable_type = match var_type {
            TypeRef::NonNull(inner) => inner.as_ref(),
            other => other,
        };
        let matches_scalar = matches!(nullable_type, TypeRef::Named(n) if n == arg_def.scalar.name());
        if !matches_scalar {
            self.error(
                format!(
                    "Type mismatch on variable ${name} and argument {} ({var_type} / {})",
                    arg_def.name,
                    arg_def.type_name()
                ),
                pos,
                path.to_vec(),
            );
            return None;
        }
        if arg_def.required && !var_type.is_non_null() && definition.default_value.is_none() {
            self.error(
                format!(
                    "Nullability mismatch on variable ${name} and argument {} ({var_type} / {})",
                    arg_def.name,
                    arg_def.type_name()
                ),
                pos,
                path.to_vec(),
            );
            return None;
        }

        self.values.get(name).cloned().flatten()
    }
}

/// Converts a constant literal (a variable default) to JSON.
fn literal_to_json(value: &Value) -> Json {
    match value {
        Value::Int(n) => Json::from(*n),
        Value::Float(n) => Number::from_f64(*n).map_or(Json::Null, Json::Number),
        Value::String(s) | Value::Enum(s) => Json::String(s.clone()),
        Value::Boolean(b) => Json::Bool(*b),
        Value::Null | Value::Variable(_) => Json::Null,
        Value::List(items) => Json::Array(items.iter().map(literal_to_json).collect()),
        Value::Object(fields) => Json::Object(
            fields
                .iter()
                .map(|(name, value)| (name.clone(), literal_to_json(value)))
                .collect(),
        ),
    }
}

/// Coerces a provided variable against its declared type.
///
/// Returns `None` if the value is invalid, `Some(None)` if it is absent and
/// allowed to be.
fn coerce_variable(var_type: &TypeRef, value: Option<&Json>) -> Option<Option<Json>> {
    match (var_type, value) {
        (TypeRef::NonNull(_), None | Some(Json::Null)) => None,
        (_, None) => Some(None),
        (_, Some(Json::Null)) => Some(Some(Json::Null)),
        (var_type, Some(value)) => coerce_present(var_type, value).map(Some),
    }
}

fn coerce_present(var_type: &TypeRef, value: &Json) -> Option<Json> {
    match var_type {
        TypeRef::NonNull(inner) => {
            if value.is_null() {
                None
            } else {
                coerce_present(inner, value)
            }
        }
        TypeRef::List(inner) => match value {
            Json::Array(items) => items
                .iter()
                .map(|item| coerce_item(inner, item))
                .collect::<Option<Vec<_>>>()
                .map(Json::Array),
            single => coerce_item(inner, single).map(|item| Json::Array(vec![item])),
        },
        TypeRef::Named(name) => Scalar::from_name(name)?.coerce_json(value),
    }
}

fn coerce_item(item_type: &TypeRef, value: &Json) -> Option<Json> {
    if value.is_null() {
        (!item_type.is_non_null()).then_some(Json::Null)
    } else {
        coerce_present(item_type, value)
    }
}
