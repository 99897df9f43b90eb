//! Staged response builders.
//!
//! `XResponseBuilder().StatusCode200().Headers(h).ApplicationJson().Body(v).Build()`:
//! each stage only exposes the methods that are legal next, so an
//! undeclared status, content type or body type does not compile.

use crate::error::Result;
use crate::name::exported;
use crate::v3::codegen::backend::go::{comment, format_var_name, quote, Context};
use crate::v3::codegen::ir::{Operation, Response, Status};
use crate::v3::codegen::sink::Sink;

use log::trace;

pub(super) fn response_interface(operation: &Operation) -> String {
    format!("{}Response", operation.name)
}

impl Context<'_> {
    pub(super) fn emit_response(&self, sink: &mut Sink, operation: &Operation) -> Result<()> {
        let owner = format!("responses of operation {}", operation.name);
        let interface = response_interface(operation);
        let marker = format!("is{interface}");
        let wrapper = format_var_name(&interface);
        let constructor = format!("{interface}Builder");
        let builder = format_var_name(&constructor);

        for name in [&interface, &wrapper, &constructor, &builder] {
            sink.declare(name, &owner)?;
        }
        trace!("emitting {} responses of `{}`", operation.responses.len(), operation.name);

        sink.blank();
        comment(sink, &interface, Some(&format!("is the response of {}.", operation.name)));
        sink.block(format!("type {interface} interface"), |s| {
            s.line("Response");
            s.line(format!("{marker}()"));
        });
        sink.blank();
        sink.block(format!("type {wrapper} struct"), |s| s.line("response"));
        sink.blank();
        sink.line(format!("func ({wrapper}) {marker}() {{}}"));
        sink.blank();
        sink.block(format!("func {constructor}() *{builder}"), |s| {
            s.line(format!("return new({builder})"))
        });
        sink.blank();
        sink.block(format!("type {builder} struct"), |s| s.line("response"));

        for response in &operation.responses {
            self.emit_status(sink, operation, response, &builder, &wrapper, &interface, &owner)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_status(
        &self,
        sink: &mut Sink,
        operation: &Operation,
        response: &Response,
        builder: &str,
        wrapper: &str,
        interface: &str,
        owner: &str,
    ) -> Result<()> {
        let label = response.status.label();
        let status_builder = format_var_name(&format!("{}{label}ResponseBuilder", operation.name));
        sink.declare(&status_builder, owner)?;

        let (parameter, code) = match response.status {
            Status::Code(code) => (String::new(), code.to_string()),
            Status::Range(_) | Status::Default => ("code int".to_string(), "code".to_string()),
        };
        sink.blank();
        comment(
            sink,
            &format!("StatusCode{label}"),
            response.description.as_deref(),
        );
        sink.block(
            format!("func (b *{builder}) StatusCode{label}({parameter}) *{status_builder}"),
            |s| {
                s.line(format!("b.response.statusCode = {code}"));
                s.line(format!("return &{status_builder}{{response: b.response}}"));
            },
        );
        sink.blank();
        sink.block(format!("type {status_builder} struct"), |s| s.line("response"));

        // stage exposing the content type methods
        let content_stage = if response.headers.is_empty() {
            status_builder.clone()
        } else {
            self.emit_headers(sink, operation, response, &status_builder, owner)?
        };

        if response.contents.is_empty() {
            sink.blank();
            sink.block(format!("func (b *{content_stage}) Build() {interface}"), |s| {
                s.line(format!("return {wrapper}{{response: b.response}}"))
            });
            return Ok(());
        }

        for content in &response.contents {
            let body_builder =
                format_var_name(&format!("{}{label}{}ResponseBuilder", operation.name, content.tag));
            let final_builder = format_var_name(&format!(
                "{}{label}{}BodyResponseBuilder",
                operation.name, content.tag
            ));
            sink.declare(&body_builder, owner)?;
            sink.declare(&final_builder, owner)?;
            let body = self.go_type(sink, &content.schema);

            sink.blank();
            sink.block(
                format!("func (b *{content_stage}) {}() *{body_builder}", content.tag),
                |s| {
                    s.line(format!(
                        "b.response.contentType = {}",
                        quote(&content.content_type)
                    ));
                    s.line(format!("return &{body_builder}{{response: b.response}}"));
                },
            );
            sink.blank();
            sink.block(format!("type {body_builder} struct"), |s| s.line("response"));
            sink.blank();
            sink.block(
                format!("func (b *{body_builder}) Body(body {body}) *{final_builder}"),
                |s| {
                    s.line("b.response.body = body");
                    s.line(format!("return &{final_builder}{{response: b.response}}"));
                },
            );
            sink.blank();
            sink.block(format!("type {final_builder} struct"), |s| s.line("response"));
            sink.blank();
            sink.block(format!("func (b *{final_builder}) Build() {interface}"), |s| {
                s.line(format!("return {wrapper}{{response: b.response}}"))
            });
        }
        Ok(())
    }

    /// Declares the headers struct and the `Headers` stage; returns the name
    /// of the stage that follows it.
    fn emit_headers(
        &self,
        sink: &mut Sink,
        operation: &Operation,
        response: &Response,
        status_builder: &str,
        owner: &str,
    ) -> Result<String> {
        let label = response.status.label();
        let headers = format!("{}{label}Headers", operation.name);
        let next = format_var_name(&format!("{}{label}HeadersResponseBuilder", operation.name));
        sink.declare(&headers, owner)?;
        sink.declare(&next, owner)?;

        let mut rows = vec![];
        let mut assignments = vec![];
        for header in &response.headers {
            let field = exported(&header.name);
            rows.push(vec![
                field.clone(),
                self.scalar_field_type(sink, &header.field).to_string(),
            ]);
            let key = quote(&header.name);
            if header.field.is_required() {
                let value = self.format_scalar(sink, &header.field.schema, &format!("headers.{field}"));
                assignments.push((None, format!("b.response.headers[{key}] = {value}")));
            } else {
                let value =
                    self.format_scalar(sink, &header.field.schema, &format!("headers.{field}.Get()"));
                assignments.push((
                    Some(format!(
                        "value := {value}; headers.{field}.IsSet() && value != \"\""
                    )),
                    format!("b.response.headers[{key}] = value"),
                ));
            }
        }

        sink.blank();
        sink.block(format!("type {headers} struct"), |s| s.rows(&rows));
        sink.blank();
        sink.block(
            format!("func (b *{status_builder}) Headers(headers {headers}) *{next}"),
            |s| {
                s.line("b.response.headers = make(map[string]string)");
                for (guard, assignment) in &assignments {
                    match guard {
                        Some(guard) => s.block(format!("if {guard}"), |s| s.line(assignment)),
                        None => s.line(assignment),
                    }
                }
                s.line(format!("return &{next}{{response: b.response}}"));
            },
        );
        sink.blank();
        sink.block(format!("type {next} struct"), |s| s.line("response"));
        Ok(next)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::v3::codegen::backend::go::IMPORT_ALIASES;
    use crate::v3::codegen::ir::Program;
    use crate::v3::codegen::lowerer::Lowerer;
    use crate::v3::Document;

    fn program(yaml: &str) -> Program {
        let document = Document::from_text(yaml, "test.yaml").unwrap();
        Lowerer::new(&document.spec)
            .lower(document.canonical_json(), Config::new("api", "out"))
            .unwrap()
    }

    #[test]
    fn emits_the_builder_cascade() {
        let program = program(
            r#"
openapi: 3.0.3
info: {title: users, version: "1"}
paths:
  /users:
    get:
      responses:
        "200":
          description: the users
          headers:
            X-Total:
              required: true
              schema:
                type: integer
            X-Cursor:
              schema:
                type: string
          content:
            application/json:
              schema:
                type: array
                items:
                  type: string
        default:
          description: failure
"#,
        );
        let context = Context::new(&program, None);
        let mut sink = Sink::new("\t", Some("api"), IMPORT_ALIASES);
        context
            .emit_response(&mut sink, &program.operations[0])
            .unwrap();
        let body = sink.body();

        assert!(body.contains("type GetUsersResponse interface {\n\tResponse\n\tisGetUsersResponse()\n}"));
        assert!(body.contains("func GetUsersResponseBuilder() *getUsersResponseBuilder {"));
        assert!(body.contains(
            "func (b *getUsersResponseBuilder) StatusCode200() *getUsers200ResponseBuilder {\n\tb.response.statusCode = 200\n"
        ));
        assert!(body.contains(
            "func (b *getUsersResponseBuilder) StatusCodeDefault(code int) *getUsersDefaultResponseBuilder {"
        ));
        assert!(body.contains("type GetUsers200Headers struct {\n\tXTotal  int\n\tXCursor Optional[string]\n}"));
        assert!(body.contains("\tb.response.headers[\"X-Total\"] = strconv.Itoa(headers.XTotal)\n"));
        assert!(body.contains(
            "\tif value := headers.XCursor.Get(); headers.XCursor.IsSet() && value != \"\" {\n\t\tb.response.headers[\"X-Cursor\"] = value\n\t}"
        ));
        assert!(body.contains("\tb.response.contentType = \"application/json\"\n"));
        assert!(body.contains("Body(body GetUsers200ApplicationJsonResponseBody)"));
        assert!(body.contains("func (b *getUsersDefaultResponseBuilder) Build() GetUsersResponse {"));
    }
}
