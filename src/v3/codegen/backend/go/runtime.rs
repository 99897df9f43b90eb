//! Fixed Go declarations that every generated package carries.

use crate::error::Result;
use crate::v3::codegen::backend::go::VALIDATION;
use crate::v3::codegen::sink::Sink;

/// Closed set of request processing outcomes, in declaration order.
pub const RESULT_KINDS: &[&str] = &[
    "ParseSucceed",
    "BodyUnmarshalFailed",
    "BodyValidationFailed",
    "HeaderParseFailed",
    "HeaderValidationFailed",
    "QueryParseFailed",
    "QueryValidationFailed",
    "PathParseFailed",
    "PathValidationFailed",
    "SecurityParseFailed",
    "SecurityCheckFailed",
];

const OPTIONAL: &str = r#"
// Optional holds a value that is absent, explicitly null or set.
type Optional[T any] struct {
	value  T
	isSet  bool
	isNull bool
}

// NewOptional returns a set Optional.
func NewOptional[T any](value T) Optional[T] {
	return Optional[T]{value: value, isSet: true}
}

// Get returns the value, or the zero value when it is not set.
func (o Optional[T]) Get() T {
	return o.value
}

// IsSet reports whether a non-null value was provided.
func (o Optional[T]) IsSet() bool {
	return o.isSet
}

// IsNull reports whether an explicit null was provided.
func (o Optional[T]) IsNull() bool {
	return o.isNull
}

// IsZero reports an unset value, so `omitzero` leaves it out of the JSON.
func (o Optional[T]) IsZero() bool {
	return !o.isSet
}

func (o *Optional[T]) Set(value T) {
	o.value = value
	o.isSet = true
	o.isNull = false
}

func (o *Optional[T]) UnmarshalJSON(data []byte) error {
	if string(data) == "null" {
		var zero T
		o.value, o.isSet, o.isNull = zero, false, true
		return nil
	}
	if err := json.Unmarshal(data, &o.value); err != nil {
		return err
	}
	o.isSet, o.isNull = true, false
	return nil
}

func (o Optional[T]) MarshalJSON() ([]byte, error) {
	if !o.isSet {
		return []byte("null"), nil
	}
	return json.Marshal(o.value)
}

// Value exposes the wrapped value to validation rules. Unset values read as nil.
func (o Optional[T]) Value() (driver.Value, error) {
	if !o.isSet {
		return nil, nil
	}
	return o.value, nil
}

func (o Optional[T]) Validate() error {
	if !o.isSet {
		return nil
	}
	if validatable, ok := any(o.value).(validation.Validatable); ok {
		return validatable.Validate()
	}
	return nil
}
"#;

const ERRORS: &str = r#"
// RequiredFieldMissingError reports a required field absent from the payload.
type RequiredFieldMissingError struct {
	Field string
}

func (e RequiredFieldMissingError) Error() string {
	return fmt.Sprintf("required field %q is missing", e.Field)
}

// RequiredFieldNullError reports a required field set to null.
type RequiredFieldNullError struct {
	Field string
}

func (e RequiredFieldNullError) Error() string {
	return fmt.Sprintf("required field %q must not be null", e.Field)
}

// InvalidEnumValueError reports a value outside of an enumeration.
type InvalidEnumValueError struct {
	Type  string
	Value interface{}
}

func (e InvalidEnumValueError) Error() string {
	return fmt.Sprintf("invalid %s value %v", e.Type, e.Value)
}

// PatternMismatchError reports a value rejected by a regular expression.
type PatternMismatchError struct {
	Field   string
	Pattern string
}

func (e PatternMismatchError) Error() string {
	return fmt.Sprintf("%s does not match %s", e.Field, e.Pattern)
}
"#;

const PROCESSING_RESULT: &str = r#"
// RequestProcessingResult is the outcome of parsing and validating a request.
type RequestProcessingResult struct {
	err  error
	kind RequestProcessingResultType
}

func NewRequestProcessingResult(kind RequestProcessingResultType, err error) RequestProcessingResult {
	return RequestProcessingResult{err: err, kind: kind}
}

func (r RequestProcessingResult) Type() RequestProcessingResultType {
	return r.kind
}

func (r RequestProcessingResult) Err() error {
	return r.err
}
"#;

const RESPONSE: &str = r#"
// RequiredParameterMissingError reports an empty required parameter.
type RequiredParameterMissingError struct {
	Parameter string
}

func (e RequiredParameterMissingError) Error() string {
	return fmt.Sprintf("required parameter %q is missing", e.Parameter)
}

// Response is a built response ready to be written.
type Response interface {
	StatusCode() int
	Headers() map[string]string
	Body() interface{}
	ContentType() string
	WriteTo(w http.ResponseWriter) error
}

type response struct {
	statusCode  int
	headers     map[string]string
	body        interface{}
	contentType string
}

func (r response) StatusCode() int {
	return r.statusCode
}

func (r response) Headers() map[string]string {
	return r.headers
}

func (r response) Body() interface{} {
	return r.body
}

func (r response) ContentType() string {
	return r.contentType
}

// WriteTo writes headers, content type and status code, then the encoded body.
func (r response) WriteTo(w http.ResponseWriter) error {
	body, err := marshalBody(r.contentType, r.body)
	if err != nil {
		return err
	}
	return writeBody(w, r, body)
}

func marshalBody(contentType string, body interface{}) ([]byte, error) {
	switch value := body.(type) {
	case nil:
		return nil, nil
	case []byte:
		return value, nil
	case string:
		return []byte(value), nil
	}
	mediaType, _, _ := mime.ParseMediaType(contentType)
	switch mediaType {
	case "application/xml", "text/xml":
		return xml.Marshal(body)
	default:
		return json.Marshal(body)
	}
}

func writeBody(w http.ResponseWriter, resp Response, body []byte) error {
	for name, value := range resp.Headers() {
		w.Header().Set(name, value)
	}
	if contentType := resp.ContentType(); contentType != "" {
		w.Header().Set("Content-Type", contentType)
	}
	w.WriteHeader(resp.StatusCode())
	if len(body) == 0 {
		return nil
	}
	_, err := w.Write(body)
	return err
}

func writeResponse(w http.ResponseWriter, r *http.Request, hooks *Hooks, operation string, resp Response) {
	if resp == nil {
		w.WriteHeader(http.StatusInternalServerError)
		return
	}
	body, err := marshalBody(resp.ContentType(), resp.Body())
	if err != nil {
		if hooks.ResponseBodyMarshalFailed != nil {
			hooks.ResponseBodyMarshalFailed(w, r, operation, err)
			return
		}
		w.WriteHeader(http.StatusInternalServerError)
		return
	}
	if hooks.ResponseBodyMarshalCompleted != nil {
		hooks.ResponseBodyMarshalCompleted(r, operation)
	}
	if err := writeBody(w, resp, body); err != nil {
		if hooks.ResponseBodyWriteFailed != nil {
			hooks.ResponseBodyWriteFailed(r, operation, resp.StatusCode(), err)
		}
		return
	}
	if hooks.ResponseBodyWriteCompleted != nil {
		hooks.ResponseBodyWriteCompleted(r, operation, resp.StatusCode())
	}
}

func redirectHandler(hooks *Hooks, operation string) http.HandlerFunc {
	return func(w http.ResponseWriter, r *http.Request) {
		target := strings.TrimSuffix(r.URL.Path, "/")
		if r.URL.RawQuery != "" {
			target += "?" + r.URL.RawQuery
		}
		if hooks.RequestRedirectStarted != nil {
			hooks.RequestRedirectStarted(r, operation, target)
		}
		http.Redirect(w, r, target, http.StatusPermanentRedirect)
	}
}
"#;

/// Writes the shared component declarations and registers their imports.
pub fn components(sink: &mut Sink) -> Result<()> {
    for path in ["database/sql/driver", "encoding/json", "fmt", VALIDATION] {
        sink.import(path);
    }
    for name in [
        "Optional",
        "NewOptional",
        "RequiredFieldMissingError",
        "RequiredFieldNullError",
        "InvalidEnumValueError",
        "PatternMismatchError",
        "RequestProcessingResultType",
        "RequestProcessingResult",
        "NewRequestProcessingResult",
    ]
    .into_iter()
    .chain(RESULT_KINDS.iter().copied())
    {
        sink.declare(name, "runtime")?;
    }

    sink.text(OPTIONAL);
    sink.blank();
    sink.text(ERRORS);
    sink.blank();

    sink.line("// RequestProcessingResultType classifies a RequestProcessingResult.");
    sink.line("type RequestProcessingResultType uint8");
    sink.blank();
    sink.block_with("const (", ")", |s| {
        for (i, kind) in RESULT_KINDS.iter().enumerate() {
            if i == 0 {
                s.line(format!("{kind} RequestProcessingResultType = iota"));
            } else {
                s.line(*kind);
            }
        }
    });
    sink.blank();
    sink.block("func (t RequestProcessingResultType) String() string", |s| {
        s.line("switch t {");
        for kind in RESULT_KINDS {
            s.line(format!("case {kind}:"));
            s.indent();
            s.line(format!("return \"{kind}\""));
            s.dedent();
        }
        s.line("default:");
        s.indent();
        s.line("return fmt.Sprintf(\"RequestProcessingResultType(%d)\", uint8(t))");
        s.dedent();
        s.line("}");
    });
    sink.blank();
    sink.text(PROCESSING_RESULT);
    Ok(())
}

/// Writes the response helpers shared by every router.
pub fn router(sink: &mut Sink) -> Result<()> {
    for path in [
        "encoding/json",
        "encoding/xml",
        "fmt",
        "mime",
        "net/http",
        "strings",
    ] {
        sink.import(path);
    }
    for name in [
        "RequiredParameterMissingError",
        "Response",
        "response",
        "marshalBody",
        "writeBody",
        "writeResponse",
        "redirectHandler",
    ] {
        sink.declare(name, "runtime")?;
    }
    sink.text(RESPONSE);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::v3::codegen::backend::go::IMPORT_ALIASES;

    #[test]
    fn components_runtime_declares_the_taxonomy() {
        let mut sink = Sink::new("\t", None, IMPORT_ALIASES);
        components(&mut sink).unwrap();
        let body = sink.body();
        assert!(body.contains("type Optional[T any] struct {"));
        assert!(body.contains("\tParseSucceed RequestProcessingResultType = iota\n\tBodyUnmarshalFailed\n"));
        assert!(body.contains("case SecurityCheckFailed:\n\t\treturn \"SecurityCheckFailed\""));
        assert!(sink.declare("Optional", "component Optional").is_err());
        assert_eq!(sink.imports()["github.com/go-ozzo/ozzo-validation/v4"], "validation");
    }
}
