use crate::config::Config;
use crate::error::{value_kind, Diagnostic, Phase, Result};
use crate::name::{content_type_tag, exported, normalise, normalise_operation};
use crate::v3::codegen::ir::{
    AdditionalPolicy, ApiKeyLocation, BodyContent, Bound, Component, ComponentOrigin,
    Constraints, CustomType, EnumIr, EnumLiteral, EnumMember, Field, ObjectIr, Operation,
    Optionality, ParamLocation, Parameter, Primitive, PrimitiveKind, Program, RequestBody,
    Response, ResponseHeader, SchemaIr, SecurityRequirement, SecurityScheme, SecuritySchemeKind,
    Status,
};
use crate::v3::extensions::{check_pattern, GoExtensions};
use crate::v3::schema::AdditionalProperties;
use crate::v3::{self, Item, OpenApi, ParameterLocation, PathItem, Schema, SCHEMAS_REF};

use indexmap::IndexMap;
use log::{debug, trace, warn};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// The schema is the declaration itself.
    Declared,
    /// The schema sits inside another one and gets its own inline component.
    Nested,
}

/// Walks an OpenAPI document once and produces the closed [`Program`].
pub struct Lowerer<'a> {
    spec: &'a OpenApi,
    components: BTreeMap<String, Component>,
    // (schema, location) pairs that must resolve to a string once every component is known
    string_checks: Vec<(SchemaIr, String)>,
}

impl<'a> Lowerer<'a> {
    pub fn new(spec: &'a OpenApi) -> Self {
        Self {
            spec,
            components: BTreeMap::new(),
            string_checks: vec![],
        }
    }

    pub fn lower(mut self, spec_json: String, config: Config) -> Result<Program> {
        self.add_component_schemas()?;
        let security_schemes = self.lower_security_schemes()?;
        let operations = self.lower_operations(&security_schemes)?;
        self.check_string_fields()?;

        debug!(
            "lowered {} components and {} operations",
            self.components.len(),
            operations.len()
        );
        Ok(Program {
            title: self.spec.info.title.clone(),
            components: self.components,
            operations,
            security_schemes,
            spec_json,
            config,
        })
    }

    fn add_component_schemas(&mut self) -> Result<()> {
        debug!("lowering component schemas");
        let mut schemas: Vec<_> = self.spec.components.schemas.iter().collect();
        trace!("sorting component schemas by name");
        schemas.sort_unstable_by_key(|(key, _)| *key);

        for (key, item) in schemas {
            let location = format!("{SCHEMAS_REF}{key}");
            let name = exported(key);
            if name.is_empty() {
                return Err(Diagnostic::schema_invalid(
                    location,
                    "schema name has no identifier characters",
                ));
            }
            trace!("processing component `{key}` as `{name}`");

            let (schema, description, skip_validation) = match item {
                Item::Reference(ref_) => (self.reference(ref_, &location)?, None, false),
                Item::Object(schema) => {
                    let extensions = GoExtensions::parse(&schema.extensions, &location)?;
                    (
                        self.classify(schema, &name, &location, Placement::Declared)?,
                        schema.description.clone(),
                        extensions.skip_validation,
                    )
                }
            };
            self.register(Component {
                name,
                schema,
                description,
                origin: ComponentOrigin::Declared(key.clone()),
                skip_validation,
            })?;
        }
        Ok(())
    }

    fn register(&mut self, component: Component) -> Result<()> {
        trace!("registering component `{}`", component.name);
        if let Some(existing) = self.components.get(&component.name) {
            return Err(Diagnostic::name_collision(
                Phase::Lower,
                &component.name,
                &existing.origin.to_string(),
                &component.origin.to_string(),
            ));
        }
        self.components.insert(component.name.clone(), component);
        Ok(())
    }

    fn reference(&self, ref_: &str, location: &str) -> Result<SchemaIr> {
        match ref_.strip_prefix(SCHEMAS_REF) {
            Some(key) if self.spec.components.schemas.contains_key(key) => {
                Ok(SchemaIr::Named(exported(key)))
            }
            Some(_) => Err(Diagnostic::schema_invalid(
                location,
                format!("reference `{ref_}` points to a missing schema"),
            )),
            None => Err(Diagnostic::schema_invalid(
                location,
                format!("reference `{ref_}` is not a local schema reference"),
            )
            .expected(format!("{SCHEMAS_REF}<name>"))
            .with_hint("bundle external documents into `components` first")),
        }
    }

    fn lower_nested(&mut self, item: &Item<Schema>, hint: &str, location: &str) -> Result<SchemaIr> {
        match item {
            Item::Reference(ref_) => self.reference(ref_, location),
            Item::Object(schema) => self.classify(schema, hint, location, Placement::Nested),
        }
    }

    fn classify(
        &mut self,
        schema: &Schema,
        hint: &str,
        location: &str,
        placement: Placement,
    ) -> Result<SchemaIr> {
        let extensions = GoExtensions::parse(&schema.extensions, location)?;

        if let Some(target) = extensions.go_type {
            trace!("`{hint}` is the external type `{target}`");
            return Ok(SchemaIr::Custom(CustomType {
                target,
                parse_fn: extensions.string_parse,
                validate: !extensions.skip_validation,
            }));
        }
        if extensions.string_parse.is_some() {
            return Err(Diagnostic::schema_invalid(
                location,
                "`x-go-type-string-parse` requires `x-go-type`",
            )
            .with_hint("declare the target type with `x-go-type`"));
        }

        if schema.is_composition() {
            return self.lower_composition(schema, hint, location);
        }

        if schema.is_enum() {
            let enum_ = lower_enum(schema, location)?;
            return self.place(SchemaIr::Enum(enum_), hint, location, placement, schema);
        }

        if schema.is_array() {
            let element = match &schema.items {
                Some(items) => {
                    self.lower_nested(items, &format!("{hint}Item"), &format!("{location}/items"))?
                }
                None => SchemaIr::opaque(),
            };
            return Ok(SchemaIr::Array {
                element: Box::new(element),
                min_items: schema.min_items,
                max_items: schema.max_items,
            });
        }

        if schema.is_object()
            || schema.additional_properties.is_some()
            || extensions.map_type.is_some()
        {
            let object = self.lower_object(schema, hint, location, &extensions)?;
            if object.fields.is_empty() && placement == Placement::Nested {
                trace!("keeping field-less object `{hint}` inline");
                return Ok(SchemaIr::Object(object));
            }
            return self.place(SchemaIr::Object(object), hint, location, placement, schema);
        }

        let kind = match schema.type_() {
            Some("boolean") => PrimitiveKind::Bool,
            Some("integer") => PrimitiveKind::Int,
            Some("number") => PrimitiveKind::Float,
            Some("string") => string_kind(schema.format.as_deref()),
            None => {
                trace!("untyped schema `{hint}` lowers to an opaque value");
                return Ok(SchemaIr::opaque());
            }
            Some(other) => {
                return Err(Diagnostic::schema_invalid(location, "unsupported schema type")
                    .received(other)
                    .expected("boolean, integer, number, string, array or object"))
            }
        };
        Ok(SchemaIr::Primitive(Primitive {
            kind,
            format_hint: schema.format.clone(),
        }))
    }

    fn place(
        &mut self,
        schema: SchemaIr,
        hint: &str,
        location: &str,
        placement: Placement,
        source: &Schema,
    ) -> Result<SchemaIr> {
        match placement {
            Placement::Declared => Ok(schema),
            Placement::Nested => {
                let extensions = GoExtensions::parse(&source.extensions, location)?;
                self.register(Component {
                    name: hint.to_string(),
                    schema,
                    description: source.description.clone(),
                    origin: ComponentOrigin::Inline(location.to_string()),
                    skip_validation: extensions.skip_validation,
                })?;
                Ok(SchemaIr::Named(hint.to_string()))
            }
        }
    }

    fn lower_composition(&mut self, schema: &Schema, hint: &str, location: &str) -> Result<SchemaIr> {
        if let [Item::Reference(ref_)] = schema.all_of.as_slice() {
            if schema.one_of.is_empty() && schema.any_of.is_empty() {
                trace!("inlining single-reference allOf `{ref_}`");
                return self.reference(ref_, &format!("{location}/allOf/0"));
            }
        }

        let (keyword, members) = if !schema.all_of.is_empty() {
            ("allOf", &schema.all_of)
        } else if !schema.one_of.is_empty() {
            ("oneOf", &schema.one_of)
        } else {
            ("anyOf", &schema.any_of)
        };
        trace!("`{hint}` is an erased {keyword} of {} members", members.len());

        let mut lowered = Vec::with_capacity(members.len());
        for (i, member) in members.iter().enumerate() {
            lowered.push(self.lower_nested(
                member,
                &format!("{hint}{}{i}", normalise(keyword)),
                &format!("{location}/{keyword}/{i}"),
            )?);
        }
        Ok(match keyword {
            "allOf" => SchemaIr::AllOf(lowered),
            "oneOf" => SchemaIr::OneOf(lowered),
            _ => SchemaIr::AnyOf(lowered),
        })
    }

    fn lower_object(
        &mut self,
        schema: &Schema,
        hint: &str,
        location: &str,
        extensions: &GoExtensions,
    ) -> Result<ObjectIr> {
        let mut fields = IndexMap::new();
        let mut identifiers: HashMap<String, &str> = HashMap::new();

        for (property, item) in &schema.properties {
            let field_location = format!("{location}/properties/{property}");
            let identifier = exported(property);
            if identifier.is_empty() {
                return Err(Diagnostic::schema_invalid(
                    field_location,
                    "property name has no identifier characters",
                ));
            }
            if let Some(first) = identifiers.insert(identifier.clone(), property) {
                return Err(Diagnostic::name_collision(
                    Phase::Lower,
                    &format!("{hint}.{identifier}"),
                    first,
                    property,
                )
                .at(location));
            }

            let required = schema.required.contains(property);
            let field = self.lower_field(
                property,
                item,
                required,
                &format!("{hint}{identifier}"),
                &field_location,
            )?;
            fields.insert(property.clone(), field);
        }

        let mut required = BTreeSet::new();
        for name in &schema.required {
            if fields.contains_key(name) {
                required.insert(name.clone());
            } else {
                warn!("{location}: required property `{name}` is not declared, ignoring");
            }
        }

        let additional = if let Some(map_type) = &extensions.map_type {
            AdditionalPolicy::GoMapType(map_type.clone())
        } else {
            match &schema.additional_properties {
                None | Some(AdditionalProperties::Allowed(false)) => AdditionalPolicy::Forbidden,
                Some(AdditionalProperties::Allowed(true)) => AdditionalPolicy::Any,
                Some(AdditionalProperties::Schema(item)) => {
                    AdditionalPolicy::Typed(Box::new(self.lower_nested(
                        item,
                        &format!("{hint}Value"),
                        &format!("{location}/additionalProperties"),
                    )?))
                }
            }
        };
        if !fields.is_empty() && additional != AdditionalPolicy::Forbidden {
            trace!("{location}: additional properties next to declared fields are not represented");
        }

        Ok(ObjectIr {
            fields,
            required,
            additional,
        })
    }

    fn lower_field(
        &mut self,
        json_name: &str,
        item: &Item<Schema>,
        required: bool,
        hint: &str,
        location: &str,
    ) -> Result<Field> {
        let schema = self.lower_nested(item, hint, location)?;
        let (extensions, nullable, description, constraints) = match item {
            Item::Object(source) => (
                GoExtensions::parse(&source.extensions, location)?,
                source.is_nullable(),
                source.description.clone(),
                constraints(source, location)?,
            ),
            Item::Reference(ref_) => (
                GoExtensions::default(),
                self.spec
                    .get_ref_schema(ref_)
                    .and_then(Item::as_object)
                    .map(Schema::is_nullable)
                    .unwrap_or_default(),
                None,
                Constraints::default(),
            ),
        };

        let optionality = if extensions.pointer {
            Optionality::Pointer
        } else if required {
            Optionality::Required
        } else if nullable {
            Optionality::OptionalNullable
        } else {
            Optionality::Optional
        };
        trace!("field `{json_name}` at {location} is {optionality:?}");

        if extensions.regex.is_some() || extensions.string_trimmable {
            self.string_checks
                .push((schema.clone(), location.to_string()));
        }

        Ok(Field {
            json_name: json_name.to_string(),
            schema,
            optionality,
            omitempty: extensions.omitempty,
            regex: extensions.regex,
            constraints,
            trimmable: extensions.string_trimmable,
            skip_validation: extensions.skip_validation,
            description,
        })
    }

    fn resolve<'s>(&'s self, schema: &'s SchemaIr) -> &'s SchemaIr {
        let mut current = schema;
        for _ in 0..=self.components.len() {
            match current {
                SchemaIr::Named(name) => match self.components.get(name) {
                    Some(component) => current = &component.schema,
                    None => break,
                },
                _ => break,
            }
        }
        current
    }

    fn check_string_fields(&self) -> Result<()> {
        for (schema, location) in &self.string_checks {
            if self.resolve(schema).as_primitive() != Some(PrimitiveKind::String) {
                return Err(Diagnostic::schema_invalid(
                    location.as_str(),
                    "`x-go-regex` and `x-go-string-trimmable` apply to string values only",
                )
                .expected("string"));
            }
        }
        Ok(())
    }

    fn lower_security_schemes(&self) -> Result<Vec<SecurityScheme>> {
        debug!("lowering security schemes");
        let mut schemes = vec![];
        let mut identifiers: HashMap<String, &str> = HashMap::new();

        for (name, item) in &self.spec.components.security_schemes {
            let location = format!("{}{name}", v3::SECURITY_SCHEMES_REF);
            let scheme = self.spec.resolve_security_scheme(item).ok_or_else(|| {
                Diagnostic::schema_invalid(location.as_str(), "security scheme reference does not resolve")
            })?;
            if let Some(first) = identifiers.insert(exported(name), name) {
                return Err(Diagnostic::name_collision(
                    Phase::Lower,
                    &exported(name),
                    first,
                    name,
                ));
            }

            let kind = match scheme {
                v3::SecurityScheme::Http { scheme, .. } => match scheme.to_lowercase().as_str() {
                    "bearer" => SecuritySchemeKind::HttpBearer,
                    "basic" => SecuritySchemeKind::HttpBasic,
                    other => {
                        return Err(Diagnostic::schema_invalid(
                            location,
                            "unsupported HTTP authentication scheme",
                        )
                        .received(other)
                        .expected("bearer or basic"))
                    }
                },
                v3::SecurityScheme::ApiKey { name, in_, .. } => SecuritySchemeKind::ApiKey {
                    location: match in_ {
                        v3::security::ApiKeyLocation::Header => ApiKeyLocation::Header,
                        v3::security::ApiKeyLocation::Query => ApiKeyLocation::Query,
                        v3::security::ApiKeyLocation::Cookie => ApiKeyLocation::Cookie,
                    },
                    name: name.clone(),
                },
                v3::SecurityScheme::OAuth2 { .. } => SecuritySchemeKind::OAuth2,
                v3::SecurityScheme::OpenIdConnect { .. } => {
                    trace!("treating openIdConnect scheme `{name}` like oauth2");
                    SecuritySchemeKind::OAuth2
                }
            };
            trace!("security scheme `{name}` is {kind:?}");
            schemes.push(SecurityScheme {
                name: name.clone(),
                kind,
            });
        }
        schemes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(schemes)
    }

    fn lower_operations(&mut self, schemes: &[SecurityScheme]) -> Result<Vec<Operation>> {
        debug!("lowering operations");
        let spec = self.spec;
        let mut sources: HashMap<String, String> = HashMap::new();
        let mut operations = vec![];

        for (path, item) in &spec.paths.0 {
            if let Some(ref_) = &item.ref_ {
                warn!("path item `{path}` references `{ref_}`, external path items are not followed");
            }
            for (method, operation) in item.operations() {
                let name = normalise_operation(path, method);
                let source = format!("{} {path}", method.to_uppercase());
                if let Some(first) = sources.insert(name.clone(), source.clone()) {
                    return Err(
                        Diagnostic::name_collision(Phase::Lower, &name, &first, &source)
                            .for_operation(&name),
                    );
                }
                debug!("lowering operation `{name}` ({source})");
                let lowered = self
                    .lower_operation(&name, path, method, item, operation, schemes)
                    .map_err(|e| match e.operation {
                        Some(_) => e,
                        None => e.for_operation(&name),
                    })?;
                operations.push(lowered);
            }
        }

        operations.sort_by(|a, b| {
            (a.path.as_str(), a.method.as_str()).cmp(&(b.path.as_str(), b.method.as_str()))
        });
        Ok(operations)
    }

    fn lower_operation(
        &mut self,
        name: &str,
        path: &str,
        method: &str,
        item: &PathItem,
        operation: &v3::Operation,
        schemes: &[SecurityScheme],
    ) -> Result<Operation> {
        let path_location = format!("#/paths/{}", path.replace('~', "~0").replace('/', "~1"));
        let location = format!("{path_location}/{method}");
        let extensions = GoExtensions::parse(&operation.extensions, &location)?;
        let tag = operation
            .tags
            .first()
            .map(|tag| exported(tag))
            .filter(|tag| !tag.is_empty())
            .unwrap_or_else(|| "Default".to_string());

        let parameters =
            self.lower_parameters(name, item, operation, &path_location, &location)?;
        let request_body = self.lower_request_body(name, operation, &location)?;
        let responses = self.lower_responses(name, operation, &location)?;
        let security = self.lower_security(operation, schemes, &location)?;

        Ok(Operation {
            name: name.to_string(),
            method: method.to_string(),
            path: path.to_string(),
            tag,
            summary: operation.summary.clone(),
            description: operation.description.clone(),
            parameters,
            request_body,
            responses,
            security,
            skip_security_check: extensions.skip_security_check,
        })
    }

    fn lower_parameters(
        &mut self,
        operation_name: &str,
        item: &PathItem,
        operation: &v3::Operation,
        path_location: &str,
        location: &str,
    ) -> Result<Vec<Parameter>> {
        let spec = self.spec;
        let mut merged: Vec<(&v3::Parameter, String)> = vec![];
        let declared = item
            .parameters
            .iter()
            .enumerate()
            .map(|(i, param)| (param, format!("{path_location}/parameters/{i}")))
            .chain(
                operation
                    .parameters
                    .iter()
                    .enumerate()
                    .map(|(i, param)| (param, format!("{location}/parameters/{i}"))),
            );
        for (param, param_location) in declared {
            let param = spec.resolve_parameter(param).ok_or_else(|| {
                Diagnostic::schema_invalid(param_location.as_str(), "parameter reference does not resolve")
            })?;
            match merged
                .iter_mut()
                .find(|(existing, _)| existing.name == param.name && existing.in_ == param.in_)
            {
                Some(slot) => *slot = (param, param_location),
                None => merged.push((param, param_location)),
            }
        }

        let mut parameters = vec![];
        let mut identifiers: HashSet<(ParamLocation, String)> = HashSet::new();
        for (param, param_location) in merged {
            let param_in = match param.in_ {
                ParameterLocation::Path => ParamLocation::Path,
                ParameterLocation::Query => ParamLocation::Query,
                ParameterLocation::Header => ParamLocation::Header,
                ParameterLocation::Cookie => {
                    warn!(
                        "{operation_name}: skipping cookie parameter `{}`, cookies are not parsed",
                        param.name
                    );
                    continue;
                }
            };
            let identifier = exported(&param.name);
            if identifier.is_empty() {
                return Err(Diagnostic::schema_invalid(
                    param_location,
                    "parameter name has no identifier characters",
                ));
            }
            if !identifiers.insert((param_in, identifier.clone())) {
                return Err(Diagnostic::name_collision(
                    Phase::Lower,
                    &format!("{operation_name}{}{identifier}", param_in.title()),
                    &format!("{param_in:?} parameter"),
                    &param.name,
                )
                .at(param_location));
            }

            let mut field = self.lower_scalar_field(
                &param.name,
                param.schema.as_ref(),
                param.required || param_in == ParamLocation::Path,
                &format!("{operation_name}{}{identifier}", param_in.title()),
                &param_location,
                param_in == ParamLocation::Query,
            )?;
            let extensions = GoExtensions::parse(&param.extensions, &param_location)?;
            if extensions.regex.is_some() {
                field.regex = extensions.regex;
            }
            field.trimmable |= extensions.string_trimmable;
            field.skip_validation |= extensions.skip_validation;
            if field.regex.is_some() || field.trimmable {
                self.string_checks
                    .push((field.schema.clone(), param_location.clone()));
            }
            if field.description.is_none() {
                field.description = param.description.clone();
            }

            trace!("{operation_name}: {} parameter `{}`", param.in_, param.name);
            parameters.push(Parameter {
                name: param.name.clone(),
                location: param_in,
                field,
            });
        }
        Ok(parameters)
    }

    /// A field read from a single string source: a parameter or a response header.
    fn lower_scalar_field(
        &mut self,
        name: &str,
        schema: Option<&Item<Schema>>,
        required: bool,
        hint: &str,
        location: &str,
        allow_arrays: bool,
    ) -> Result<Field> {
        let schema_location = format!("{location}/schema");
        let mut field = match schema {
            Some(item) => self.lower_field(name, item, required, hint, &schema_location)?,
            None => Field {
                json_name: name.to_string(),
                schema: SchemaIr::primitive(PrimitiveKind::String),
                optionality: Optionality::Required,
                omitempty: false,
                regex: None,
                constraints: Constraints::default(),
                trimmable: false,
                skip_validation: false,
                description: None,
            },
        };
        field.optionality = if required {
            Optionality::Required
        } else {
            Optionality::Optional
        };

        let scalar = |schema: &SchemaIr| match schema {
            SchemaIr::Primitive(primitive) => primitive.kind != PrimitiveKind::RawJson,
            SchemaIr::Enum(_) => true,
            SchemaIr::Custom(custom) => custom.parse_fn.is_some() || custom.target.package.is_none(),
            _ => false,
        };
        let resolved = self.resolve(&field.schema);
        let accepted = match resolved {
            SchemaIr::Array { element, .. } if allow_arrays => scalar(self.resolve(element)),
            other => scalar(other),
        };
        if !accepted {
            let mut diagnostic = Diagnostic::schema_invalid(
                schema_location,
                format!("`{name}` must be a scalar value read from a string"),
            )
            .expected(if allow_arrays {
                "primitive, enum, custom type with a parse function, or an array of those"
            } else {
                "primitive, enum or custom type with a parse function"
            });
            if matches!(resolved, SchemaIr::Custom(_)) {
                diagnostic = diagnostic.with_hint("add `x-go-type-string-parse` to convert the raw string");
            }
            return Err(diagnostic);
        }
        Ok(field)
    }

    fn lower_request_body(
        &mut self,
        operation_name: &str,
        operation: &v3::Operation,
        location: &str,
    ) -> Result<Option<RequestBody>> {
        let Some(item) = &operation.request_body else {
            return Ok(None);
        };
        let body_location = format!("{location}/requestBody");
        let body = self.spec.resolve_request_body(item).ok_or_else(|| {
            Diagnostic::schema_invalid(body_location.as_str(), "request body reference does not resolve")
        })?;

        let contents = self.lower_contents(
            &body.content,
            |tag| format!("{operation_name}{tag}RequestBody"),
            &body_location,
        )?;
        if contents.is_empty() {
            trace!("{operation_name}: request body declares no content");
            return Ok(None);
        }
        Ok(Some(RequestBody {
            required: body.required,
            contents,
        }))
    }

    fn lower_contents(
        &mut self,
        content: &IndexMap<String, v3::MediaType>,
        name: impl Fn(&str) -> String,
        location: &str,
    ) -> Result<Vec<BodyContent>> {
        let mut media: Vec<_> = content.iter().collect();
        media.sort_unstable_by_key(|(content_type, _)| *content_type);

        let mut contents: Vec<BodyContent> = vec![];
        for (content_type, media_type) in media {
            let tag = content_type_tag(content_type);
            let content_location = format!("{location}/content/{content_type}");
            if let Some(existing) = contents.iter().find(|content| content.tag == tag) {
                return Err(Diagnostic::name_collision(
                    Phase::Lower,
                    &tag,
                    &existing.content_type,
                    content_type,
                )
                .at(location));
            }

            let schema = match &media_type.schema {
                Some(Item::Reference(ref_)) => self.reference(ref_, &content_location)?,
                Some(Item::Object(schema)) => {
                    let component = name(&tag);
                    let lowered =
                        self.classify(schema, &component, &content_location, Placement::Declared)?;
                    let extensions = GoExtensions::parse(&schema.extensions, &content_location)?;
                    self.register(Component {
                        name: component.clone(),
                        schema: lowered,
                        description: schema.description.clone(),
                        origin: ComponentOrigin::Inline(content_location.clone()),
                        skip_validation: extensions.skip_validation,
                    })?;
                    SchemaIr::Named(component)
                }
                None => {
                    let component = name(&tag);
                    let schema = if is_octet_stream(content_type) {
                        SchemaIr::primitive(PrimitiveKind::Bytes)
                    } else {
                        SchemaIr::opaque()
                    };
                    self.register(Component {
                        name: component.clone(),
                        schema,
                        description: None,
                        origin: ComponentOrigin::Inline(content_location.clone()),
                        skip_validation: true,
                    })?;
                    SchemaIr::Named(component)
                }
            };

            if is_octet_stream(content_type)
                && self.resolve(&schema).as_primitive() != Some(PrimitiveKind::Bytes)
            {
                return Err(Diagnostic::schema_invalid(
                    content_location,
                    "octet-stream content must be a binary string",
                )
                .expected("type: string, format: binary"));
            }

            contents.push(BodyContent {
                content_type: content_type.clone(),
                tag,
                schema,
            });
        }
        Ok(contents)
    }

    fn lower_responses(
        &mut self,
        operation_name: &str,
        operation: &v3::Operation,
        location: &str,
    ) -> Result<Vec<Response>> {
        let spec = self.spec;
        let mut responses: Vec<Response> = vec![];

        for (key, item) in &operation.responses.0 {
            let response_location = format!("{location}/responses/{key}");
            let status = Status::parse(key).ok_or_else(|| {
                Diagnostic::schema_invalid(response_location.as_str(), "invalid response status")
                    .received(key.as_str())
                    .expected("an HTTP status code, `1XX`..`5XX` or `default`")
            })?;
            if responses.iter().any(|response| response.status == status) {
                return Err(Diagnostic::name_collision(
                    Phase::Lower,
                    &format!("{operation_name}{}", status.label()),
                    &status.label(),
                    key,
                )
                .at(response_location));
            }
            let response = spec.resolve_response(item).ok_or_else(|| {
                Diagnostic::schema_invalid(response_location.as_str(), "response reference does not resolve")
            })?;
            let label = status.label();

            let contents = self.lower_contents(
                &response.content,
                |tag| format!("{operation_name}{label}{tag}ResponseBody"),
                &response_location,
            )?;

            let mut headers = vec![];
            for (header_name, header_item) in &response.headers {
                let header_location = format!("{response_location}/headers/{header_name}");
                let header = spec.resolve_header(header_item).ok_or_else(|| {
                    Diagnostic::schema_invalid(header_location.as_str(), "header reference does not resolve")
                })?;
                let mut field = self.lower_scalar_field(
                    header_name,
                    header.schema.as_ref(),
                    header.required,
                    &format!("{operation_name}{label}Header{}", exported(header_name)),
                    &header_location,
                    false,
                )?;
                if field.description.is_none() {
                    field.description = header.description.clone();
                }
                headers.push(ResponseHeader {
                    name: header_name.clone(),
                    field,
                });
            }

            trace!(
                "{operation_name}: response {label} with {} content types and {} headers",
                contents.len(),
                headers.len()
            );
            responses.push(Response {
                status,
                description: response.description.clone(),
                contents,
                headers,
            });
        }

        responses.sort_by(|a, b| a.status.cmp(&b.status));
        Ok(responses)
    }

    fn lower_security(
        &self,
        operation: &v3::Operation,
        schemes: &[SecurityScheme],
        location: &str,
    ) -> Result<Vec<SecurityRequirement>> {
        let Some(requirements) = operation.security.as_ref().or(self.spec.security.as_ref())
        else {
            return Ok(vec![]);
        };

        let mut lowered = vec![];
        for (i, requirement) in requirements.iter().enumerate() {
            for scheme in requirement.keys() {
                if !schemes.iter().any(|declared| &declared.name == scheme) {
                    return Err(Diagnostic::schema_invalid(
                        format!("{location}/security/{i}"),
                        format!("security scheme `{scheme}` is not declared"),
                    )
                    .with_hint("declare it under `components/securitySchemes`"));
                }
            }
            lowered.push(SecurityRequirement {
                schemes: requirement.keys().cloned().collect(),
            });
        }
        Ok(lowered)
    }
}

fn is_octet_stream(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|media| media.trim().eq_ignore_ascii_case(OCTET_STREAM))
}

fn string_kind(format: Option<&str>) -> PrimitiveKind {
    match format {
        Some("byte" | "binary") => PrimitiveKind::Bytes,
        Some("date" | "date-time") => PrimitiveKind::Time,
        Some("uuid") => PrimitiveKind::Uuid,
        Some("email") => PrimitiveKind::Email,
        Some("iso4217-currency-code") => PrimitiveKind::CurrencyCode,
        Some("iso3166-alpha-2") => PrimitiveKind::CountryA2,
        Some("iso3166-alpha-3") => PrimitiveKind::CountryA3,
        Some("json") => PrimitiveKind::RawJson,
        Some(other) => {
            trace!("unknown string format `{other}` lowers to a plain string");
            PrimitiveKind::String
        }
        None => PrimitiveKind::String,
    }
}

fn lower_enum(schema: &Schema, location: &str) -> Result<EnumIr> {
    let base = match schema.type_() {
        Some("string") => PrimitiveKind::String,
        Some("integer") => PrimitiveKind::Int,
        Some(other) => {
            return Err(Diagnostic::schema_invalid(location, "unsupported enum type")
                .received(other)
                .expected("string or integer"))
        }
        None if schema.enum_.iter().all(|v| v.is_string() || v.is_null()) => PrimitiveKind::String,
        None => PrimitiveKind::Int,
    };

    let mut members = vec![];
    let mut tags: HashMap<String, String> = HashMap::new();
    for (i, value) in schema.enum_.iter().enumerate() {
        let literal = match (base, value) {
            (_, Value::Null) => {
                trace!("{location}: skipping null enum member");
                continue;
            }
            (PrimitiveKind::String, Value::String(s)) => EnumLiteral::String(s.clone()),
            (PrimitiveKind::Int, Value::Number(n)) if n.as_i64().is_some() => {
                EnumLiteral::Int(n.as_i64().unwrap_or_default())
            }
            (_, other) => {
                return Err(Diagnostic::schema_invalid(
                    format!("{location}/enum/{i}"),
                    "enum member does not share the enum base type",
                )
                .received(value_kind(other))
                .expected(if base == PrimitiveKind::String {
                    "string"
                } else {
                    "integer"
                }))
            }
        };
        let tag = enum_tag(&literal);
        if let Some(first) = tags.insert(tag.clone(), literal.to_string()) {
            return Err(Diagnostic::name_collision(
                Phase::Lower,
                &tag,
                &format!("`{first}`"),
                &format!("`{literal}`"),
            )
            .at(location));
        }
        members.push(EnumMember { tag, literal });
    }

    if members.is_empty() {
        return Err(Diagnostic::schema_invalid(location, "enum has no members")
            .expected("at least one non-null member"));
    }
    Ok(EnumIr { base, members })
}

fn enum_tag(literal: &EnumLiteral) -> String {
    match literal {
        EnumLiteral::String(s) => {
            let tag = normalise(s);
            if tag.is_empty() {
                "Empty".into()
            } else {
                tag
            }
        }
        EnumLiteral::Int(i) if *i < 0 => format!("Minus{}", i.unsigned_abs()),
        EnumLiteral::Int(i) => i.to_string(),
    }
}

fn constraints(schema: &Schema, location: &str) -> Result<Constraints> {
    if let Some(pattern) = &schema.pattern {
        check_pattern(pattern, &format!("{location}/pattern"))?;
    }
    Ok(Constraints {
        min_length: schema.min_length,
        max_length: schema.max_length,
        minimum: bound(
            schema.minimum,
            schema.exclusive_minimum.as_ref(),
            location,
            "exclusiveMinimum",
        )?,
        maximum: bound(
            schema.maximum,
            schema.exclusive_maximum.as_ref(),
            location,
            "exclusiveMaximum",
        )?,
        pattern: schema.pattern.clone(),
    })
}

/// Accepts both the boolean and the numeric form of `exclusiveMinimum`/`exclusiveMaximum`.
fn bound(
    limit: Option<f64>,
    exclusive: Option<&Value>,
    location: &str,
    keyword: &str,
) -> Result<Option<Bound>> {
    match exclusive {
        None | Some(Value::Bool(false)) => Ok(limit.map(|value| Bound {
            value,
            exclusive: false,
        })),
        Some(Value::Bool(true)) => match limit {
            Some(value) => Ok(Some(Bound {
                value,
                exclusive: true,
            })),
            None => Err(Diagnostic::schema_invalid(
                format!("{location}/{keyword}"),
                format!("`{keyword}: true` has no bound to apply to"),
            )),
        },
        Some(Value::Number(n)) => Ok(n.as_f64().map(|value| Bound {
            value,
            exclusive: true,
        })),
        Some(other) => Err(Diagnostic::schema_invalid(
            format!("{location}/{keyword}"),
            format!("`{keyword}` has an unexpected value"),
        )
        .received(value_kind(other))
        .expected("boolean or number")),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::DiagnosticKind;
    use crate::v3::Document;

    fn lower(yaml: &str) -> Result<Program> {
        let document = Document::from_text(yaml, "test.yaml").unwrap();
        Lowerer::new(&document.spec).lower(document.canonical_json(), Config::new("api", "out"))
    }

    fn object<'p>(program: &'p Program, name: &str) -> &'p ObjectIr {
        match &program.component(name).unwrap().schema {
            SchemaIr::Object(object) => object,
            other => panic!("`{name}` is not an object: {other:?}"),
        }
    }

    #[test]
    fn field_optionality() {
        let program = lower(
            r#"
openapi: 3.0.3
paths: {}
components:
  schemas:
    transaction-create:
      type: object
      required: [description, amount]
      properties:
        description:
          type: string
          minLength: 8
          maxLength: 100
          x-go-string-trimmable: true
        amount:
          type: number
          minimum: 0.009
          exclusiveMinimum: true
        details:
          type: string
          nullable: true
        note:
          type: string
        owner:
          type: string
          x-go-pointer: true
"#,
        )
        .unwrap();

        let object = object(&program, "TransactionCreate");
        assert_eq!(
            object.required.iter().collect::<Vec<_>>(),
            vec!["amount", "description"]
        );
        assert_eq!(object.fields["description"].optionality, Optionality::Required);
        assert!(object.fields["description"].trimmable);
        assert_eq!(object.fields["description"].constraints.min_length, Some(8));
        assert_eq!(
            object.fields["amount"].constraints.minimum,
            Some(Bound {
                value: 0.009,
                exclusive: true
            })
        );
        assert_eq!(
            object.fields["details"].optionality,
            Optionality::OptionalNullable
        );
        assert_eq!(object.fields["note"].optionality, Optionality::Optional);
        assert_eq!(object.fields["owner"].optionality, Optionality::Pointer);
    }

    #[test]
    fn numeric_exclusive_bounds() {
        let program = lower(
            r#"
openapi: 3.1.0
paths: {}
components:
  schemas:
    Amount:
      type: object
      properties:
        value: {type: number, exclusiveMinimum: 0.009, maximum: 10}
"#,
        )
        .unwrap();
        let field = &object(&program, "Amount").fields["value"];
        assert_eq!(
            field.constraints.minimum,
            Some(Bound {
                value: 0.009,
                exclusive: true
            })
        );
        assert_eq!(
            field.constraints.maximum,
            Some(Bound {
                value: 10.0,
                exclusive: false
            })
        );
    }

    #[test]
    fn inline_nested_schemas_become_components() {
        let program = lower(
            r#"
openapi: 3.0.3
paths: {}
components:
  schemas:
    Order:
      type: object
      properties:
        status:
          type: string
          enum: [new, in-progress]
        shipping:
          type: object
          properties:
            city: {type: string}
        items:
          type: array
          items:
            type: object
            properties:
              sku: {type: string}
        extra:
          type: object
"#,
        )
        .unwrap();

        let order = object(&program, "Order");
        assert_eq!(order.fields["status"].schema, SchemaIr::Named("OrderStatus".into()));
        assert_eq!(order.fields["shipping"].schema, SchemaIr::Named("OrderShipping".into()));
        assert!(matches!(
            &order.fields["items"].schema,
            SchemaIr::Array { element, .. } if **element == SchemaIr::Named("OrderItemsItem".into())
        ));
        assert!(matches!(&order.fields["extra"].schema, SchemaIr::Object(o) if o.fields.is_empty()));

        match &program.component("OrderStatus").unwrap().schema {
            SchemaIr::Enum(enum_) => {
                let tags: Vec<_> = enum_.members.iter().map(|m| m.tag.as_str()).collect();
                assert_eq!(tags, vec!["New", "InProgress"]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            program.component("OrderShipping").unwrap().origin,
            ComponentOrigin::Inline(_)
        ));
    }

    #[test]
    fn composition_lowering() {
        let program = lower(
            r##"
openapi: 3.0.3
paths: {}
components:
  schemas:
    Base:
      type: object
      properties:
        id: {type: string}
    Alias:
      allOf:
        - $ref: '#/components/schemas/Base'
    Mixed:
      oneOf:
        - $ref: '#/components/schemas/Base'
        - type: string
"##,
        )
        .unwrap();
        assert_eq!(
            program.component("Alias").unwrap().schema,
            SchemaIr::Named("Base".into())
        );
        assert!(matches!(
            &program.component("Mixed").unwrap().schema,
            SchemaIr::OneOf(members) if members.len() == 2
        ));
    }

    #[test]
    fn enum_members() {
        let program = lower(
            r#"
openapi: 3.0.3
paths: {}
components:
  schemas:
    Level:
      type: integer
      enum: [-1, 0, 2]
    Kind:
      type: string
      nullable: true
      enum: ["", a_b, null]
"#,
        )
        .unwrap();
        match &program.component("Level").unwrap().schema {
            SchemaIr::Enum(enum_) => {
                assert_eq!(enum_.base, PrimitiveKind::Int);
                let tags: Vec<_> = enum_.members.iter().map(|m| m.tag.as_str()).collect();
                assert_eq!(tags, vec!["Minus1", "0", "2"]);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &program.component("Kind").unwrap().schema {
            SchemaIr::Enum(enum_) => {
                let tags: Vec<_> = enum_.members.iter().map(|m| m.tag.as_str()).collect();
                assert_eq!(tags, vec!["Empty", "AB"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_enums() {
        let err = lower(
            "openapi: 3.0.3\npaths: {}\ncomponents:\n  schemas:\n    E: {type: string, enum: [null]}\n",
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SchemaInvalid);
        assert_eq!(err.location.as_deref(), Some("#/components/schemas/E"));

        let err = lower(
            "openapi: 3.0.3\npaths: {}\ncomponents:\n  schemas:\n    E: {type: string, enum: [a, 1]}\n",
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SchemaInvalid);
        assert_eq!(err.received.as_deref(), Some("number"));
    }

    #[test]
    fn rejects_colliding_operations() {
        let err = lower(
            r#"
openapi: 3.0.3
paths:
  /user-list:
    get:
      responses: {"204": {description: ok}}
  /user_list:
    get:
      responses: {"204": {description: ok}}
"#,
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::NameCollision);
        assert_eq!(err.operation.as_deref(), Some("GetUserList"));
    }

    #[test]
    fn rejects_trimming_non_strings() {
        let err = lower(
            r#"
openapi: 3.0.3
paths: {}
components:
  schemas:
    Thing:
      type: object
      properties:
        count: {type: integer, x-go-string-trimmable: true}
"#,
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SchemaInvalid);
        assert_eq!(
            err.location.as_deref(),
            Some("#/components/schemas/Thing/properties/count")
        );
    }

    #[test]
    fn rejects_external_references() {
        let err = lower(
            r#"
openapi: 3.0.3
paths: {}
components:
  schemas:
    Thing:
      type: object
      properties:
        other: {$ref: 'other.yaml#/Thing'}
"#,
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SchemaInvalid);
        assert!(!err.hints.is_empty());
    }

    const OPERATIONS: &str = r##"
openapi: 3.0.3
security:
  - bearerAuth: []
paths:
  /users/{id}:
    parameters:
      - {name: id, in: path, required: true, schema: {type: string}}
      - {name: include, in: query, schema: {type: string}}
    get:
      tags: [users]
      parameters:
        - {name: include, in: query, schema: {type: string, enum: [posts, likes]}}
        - {name: session, in: cookie, schema: {type: string}}
      responses:
        "200":
          description: ok
          headers:
            X-Rate-Limit: {schema: {type: integer}}
          content:
            application/json:
              schema:
                type: object
                properties:
                  name: {type: string}
        default:
          description: error
  /transaction:
    post:
      security: []
      requestBody:
        required: true
        content:
          application/xml:
            schema: {$ref: '#/components/schemas/Transaction'}
          application/json:
            schema:
              type: object
              properties:
                amount: {type: number}
      responses:
        "201": {description: created}
components:
  securitySchemes:
    bearerAuth: {type: http, scheme: bearer}
  schemas:
    Transaction:
      type: object
      properties:
        amount: {type: number}
"##;

    #[test]
    fn lowers_operations() {
        let program = lower(OPERATIONS).unwrap();
        let names: Vec<_> = program.operations.iter().map(|op| op.name.as_str()).collect();
        assert_eq!(names, vec!["PostTransaction", "GetUsersID"]);

        let get = &program.operations[1];
        assert_eq!(get.tag, "Users");
        assert_eq!(get.parameters.len(), 2);
        let include = &get.parameters[1];
        assert_eq!(include.location, ParamLocation::Query);
        assert_eq!(include.field.optionality, Optionality::Optional);
        assert_eq!(
            include.field.schema,
            SchemaIr::Named("GetUsersIDQueryInclude".into())
        );
        assert_eq!(get.parameters[0].field.optionality, Optionality::Required);
        assert_eq!(get.security[0].schemes, vec!["bearerAuth".to_string()]);
        assert_eq!(get.responses[0].status, Status::Code(200));
        assert_eq!(get.responses[1].status, Status::Default);
        assert_eq!(get.responses[0].headers[0].name, "X-Rate-Limit");
        assert_eq!(
            get.responses[0].contents[0].schema,
            SchemaIr::Named("GetUsersID200ApplicationJsonResponseBody".into())
        );

        let post = &program.operations[0];
        assert_eq!(post.tag, "Default");
        assert!(post.security.is_empty());
        let body = post.request_body.as_ref().unwrap();
        assert!(body.required);
        let tags: Vec<_> = body.contents.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(tags, vec!["ApplicationJson", "ApplicationXml"]);
        assert_eq!(
            body.contents[0].schema,
            SchemaIr::Named("PostTransactionApplicationJsonRequestBody".into())
        );
        assert_eq!(body.contents[1].schema, SchemaIr::Named("Transaction".into()));
        assert!(program.check_ref_closure().is_ok());
    }

    #[test]
    fn rejects_undeclared_security_schemes() {
        let err = lower(
            r#"
openapi: 3.0.3
paths:
  /a:
    get:
      security: [{apiKey: []}]
      responses: {"200": {description: ok}}
"#,
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SchemaInvalid);
        assert_eq!(err.operation.as_deref(), Some("GetA"));
    }

    #[test]
    fn rejects_object_parameters() {
        let err = lower(
            r#"
openapi: 3.0.3
paths:
  /a:
    get:
      parameters:
        - name: filter
          in: query
          schema: {type: object, properties: {a: {type: string}}}
      responses: {"200": {description: ok}}
"#,
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SchemaInvalid);
    }
}
