use crate::error::Result;
use crate::name::exported;
use crate::v3::codegen::backend::go::operations::ResultNames;
use crate::v3::codegen::backend::go::{format_var_name, quote, Context};
use crate::v3::codegen::ir::{ApiKeyLocation, SecurityScheme, SecuritySchemeKind};
use crate::v3::codegen::sink::Sink;

use log::debug;

const TYPES: &str = r#"
// SecurityScheme names a security scheme declared by the document.
type SecurityScheme string

// SecurityExtractor reads the credential of a scheme from a request.
type SecurityExtractor func(r *http.Request) (name string, value string, found bool)

// SecurityHandler accepts or rejects an extracted credential.
type SecurityHandler func(r *http.Request, scheme SecurityScheme, name string, value string) error

type securityProcessor struct {
	scheme  SecurityScheme
	extract SecurityExtractor
	handle  SecurityHandler
}

// NewSecurityProcessor pairs a scheme with its extractor and handler. Processors
// passed to a router take precedence over the generated ones.
func NewSecurityProcessor(scheme SecurityScheme, extract SecurityExtractor, handle SecurityHandler) securityProcessor {
	return securityProcessor{scheme: scheme, extract: extract, handle: handle}
}

// SecurityValueMissingError reports a request without the credential of a scheme.
type SecurityValueMissingError struct {
	Scheme SecurityScheme
	Name   string
}

func (e SecurityValueMissingError) Error() string {
	return fmt.Sprintf("%s: credential %q is missing", e.Scheme, e.Name)
}
"#;

// `$` placeholders are replaced with the processing result names.
const CHECK: &str = r#"
// checkSecurity passes when every scheme of at least one alternative passes.
// The failure hook fires once, with the last failure.
func checkSecurity(r *http.Request, hooks *Hooks, processors []securityProcessor, operation string, alternatives [][]SecurityScheme) ($RESULT, bool) {
	var (
		failed     $RESULT
		failedWith SecurityScheme
	)
	for _, alternative := range alternatives {
		result, scheme, ok := checkSecurityAlternative(r, hooks, processors, operation, alternative)
		if ok {
			if hooks.RequestSecurityCheckCompleted != nil {
				hooks.RequestSecurityCheckCompleted(r, operation)
			}
			return result, true
		}
		failed, failedWith = result, scheme
	}
	if failed.Type() == $SECURITY_PARSE_FAILED {
		if hooks.RequestSecurityParseFailed != nil {
			hooks.RequestSecurityParseFailed(r, operation, string(failedWith), failed)
		}
	} else if hooks.RequestSecurityCheckFailed != nil {
		hooks.RequestSecurityCheckFailed(r, operation, string(failedWith), failed)
	}
	return failed, false
}

func checkSecurityAlternative(r *http.Request, hooks *Hooks, processors []securityProcessor, operation string, schemes []SecurityScheme) ($RESULT, SecurityScheme, bool) {
	for _, scheme := range schemes {
		if result, ok := runSecurityProcessor(r, hooks, processors, operation, scheme); !ok {
			return result, scheme, false
		}
	}
	return $NEW_RESULT($PARSE_SUCCEED, nil), "", true
}

func runSecurityProcessor(r *http.Request, hooks *Hooks, processors []securityProcessor, operation string, scheme SecurityScheme) ($RESULT, bool) {
	for _, processor := range processors {
		if processor.scheme != scheme {
			continue
		}
		name, value, found := processor.extract(r)
		if !found {
			return $NEW_RESULT($SECURITY_PARSE_FAILED, SecurityValueMissingError{Scheme: scheme, Name: name}), false
		}
		if hooks.RequestSecurityParseCompleted != nil {
			hooks.RequestSecurityParseCompleted(r, operation)
		}
		if err := processor.handle(r, scheme, name, value); err != nil {
			return $NEW_RESULT($SECURITY_CHECK_FAILED, err), false
		}
		return $NEW_RESULT($PARSE_SUCCEED, nil), true
	}
	return $NEW_RESULT($SECURITY_CHECK_FAILED, fmt.Errorf("no processor for security scheme %q", scheme)), false
}
"#;

fn constant(scheme: &SecurityScheme) -> String {
    format!("SecurityScheme{}", exported(&scheme.name))
}

fn check_method(scheme: &SecurityScheme) -> String {
    format!("SecurityCheck{}", exported(&scheme.name))
}

fn extractor(scheme: &SecurityScheme) -> String {
    format_var_name(&format!("Extract{}Security", exported(&scheme.name)))
}

/// Schemes whose credential the generated code knows how to read.
fn extractable(scheme: &SecurityScheme) -> bool {
    !matches!(scheme.kind, SecuritySchemeKind::OAuth2)
}

impl Context<'_> {
    pub(super) fn emit_security(&self, sink: &mut Sink) -> Result<()> {
        let schemes = &self.program.security_schemes;
        debug!("emitting {} security schemes", schemes.len());
        for name in [
            "SecurityScheme",
            "SecurityExtractor",
            "SecurityHandler",
            "securityProcessor",
            "NewSecurityProcessor",
            "SecurityValueMissingError",
            "SecuritySchemas",
            "securityProcessors",
            "checkSecurity",
            "checkSecurityAlternative",
            "runSecurityProcessor",
        ] {
            sink.declare(name, "security runtime")?;
        }
        sink.import("net/http");
        sink.import("fmt");

        sink.blank();
        sink.text(TYPES);

        if !schemes.is_empty() {
            let mut rows = vec![];
            for scheme in schemes {
                sink.declare(&constant(scheme), &format!("security scheme {}", scheme.name))?;
                rows.push(vec![
                    constant(scheme),
                    "SecurityScheme".to_string(),
                    "=".to_string(),
                    quote(&scheme.name),
                ]);
            }
            sink.blank();
            sink.block_with("const (", ")", |s| s.rows(&rows));
        }

        let extracted: Vec<_> = schemes.iter().filter(|scheme| extractable(scheme)).collect();
        sink.blank();
        sink.line("// SecuritySchemas checks the credentials of every scheme with a generated extractor.");
        sink.block("type SecuritySchemas interface", |s| {
            for scheme in &extracted {
                s.line(format!(
                    "{}(r *http.Request, scheme SecurityScheme, name string, value string) error",
                    check_method(scheme)
                ));
            }
        });
        sink.blank();
        sink.block(
            "func securityProcessors(schemas SecuritySchemas) []securityProcessor",
            |s| {
                s.block("if schemas == nil", |s| s.line("return nil"));
                if extracted.is_empty() {
                    s.line("return nil");
                    return;
                }
                s.line("return []securityProcessor{");
                s.indent();
                for scheme in &extracted {
                    s.line(format!(
                        "NewSecurityProcessor({}, {}, schemas.{}),",
                        constant(scheme),
                        extractor(scheme),
                        check_method(scheme)
                    ));
                }
                s.dedent();
                s.line("}");
            },
        );

        for scheme in &extracted {
            let name = extractor(scheme);
            sink.declare(&name, &format!("security scheme {}", scheme.name))?;
            sink.blank();
            sink.block(
                format!("func {name}(r *http.Request) (string, string, bool)"),
                |s| match &scheme.kind {
                    SecuritySchemeKind::HttpBearer => authorization(s, "Bearer "),
                    SecuritySchemeKind::HttpBasic => authorization(s, "Basic "),
                    SecuritySchemeKind::ApiKey { location, name } => {
                        let key = quote(name);
                        match location {
                            ApiKeyLocation::Header => {
                                s.line(format!("value := r.Header.Get({key})"));
                                s.line(format!("return {key}, value, value != \"\""));
                            }
                            ApiKeyLocation::Query => {
                                s.line(format!("value := r.URL.Query().Get({key})"));
                                s.line(format!("return {key}, value, value != \"\""));
                            }
                            ApiKeyLocation::Cookie => {
                                s.line(format!("cookie, err := r.Cookie({key})"));
                                s.block("if err != nil", |s| {
                                    s.line(format!("return {key}, \"\", false"))
                                });
                                s.line(format!("return {key}, cookie.Value, cookie.Value != \"\""));
                            }
                        }
                    }
                    SecuritySchemeKind::OAuth2 => {}
                },
            );
        }

        let names = ResultNames::new(self, sink);
        let check = CHECK
            .replace("$RESULT", &names.result)
            .replace("$NEW_RESULT", &names.new_result)
            .replace("$PARSE_SUCCEED", &names.kind("ParseSucceed"))
            .replace("$SECURITY_PARSE_FAILED", &names.kind("SecurityParseFailed"))
            .replace("$SECURITY_CHECK_FAILED", &names.kind("SecurityCheckFailed"));
        sink.blank();
        sink.text(&check);
        Ok(())
    }
}

/// Case-insensitive `Authorization` prefix match.
fn authorization(s: &mut Sink, prefix: &str) {
    let prefix = quote(prefix);
    s.line("value := r.Header.Get(\"Authorization\")");
    s.block(
        format!("if len(value) < len({prefix}) || !strings.EqualFold(value[:len({prefix})], {prefix})"),
        |s| s.line("return \"Authorization\", \"\", false"),
    );
    s.line(format!(
        "return \"Authorization\", strings.TrimSpace(value[len({prefix}):]), true"
    ));
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::v3::codegen::backend::go::IMPORT_ALIASES;
    use crate::v3::codegen::ir::Program;
    use crate::v3::codegen::lowerer::Lowerer;
    use crate::v3::Document;

    #[test]
    fn emits_extractors_and_processors() {
        let document = Document::from_text(
            r#"
openapi: 3.0.3
info: {title: secure, version: "1"}
paths: {}
components:
  securitySchemes:
    bearerAuth:
      type: http
      scheme: bearer
    api_key:
      type: apiKey
      in: cookie
      name: session
    oauth:
      type: oauth2
      flows: {}
"#,
            "test.yaml",
        )
        .unwrap();
        let program: Program = Lowerer::new(&document.spec)
            .lower(document.canonical_json(), Config::new("api", "out"))
            .unwrap();
        let context = Context::new(&program, None);
        let mut sink = Sink::new("\t", Some("api"), IMPORT_ALIASES);
        sink.import("strings");
        context.emit_security(&mut sink).unwrap();
        let body = sink.body();

        assert!(body.contains(
            "\tSecuritySchemeApiKey     SecurityScheme = \"api_key\"\n\tSecuritySchemeBearerAuth SecurityScheme = \"bearerAuth\"\n\tSecuritySchemeOauth      SecurityScheme = \"oauth\"\n"
        ));
        assert!(body.contains(
            "\tSecurityCheckBearerAuth(r *http.Request, scheme SecurityScheme, name string, value string) error\n"
        ));
        assert!(!body.contains("SecurityCheckOauth"));
        assert!(body.contains(
            "\t\tNewSecurityProcessor(SecuritySchemeBearerAuth, extractBearerAuthSecurity, schemas.SecurityCheckBearerAuth),\n"
        ));
        assert!(body.contains("\tcookie, err := r.Cookie(\"session\")\n"));
        assert!(body.contains("!strings.EqualFold(value[:len(\"Bearer \")], \"Bearer \")"));
        assert!(body.contains("return NewRequestProcessingResult(SecurityParseFailed, SecurityValueMissingError{Scheme: scheme, Name: name}), false"));
    }
}
