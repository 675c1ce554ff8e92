//! Synchronous HTTP surface for the applicant form.
//!
//! Requests are served one at a time on the calling thread; the predictor is
//! read-only so nothing is shared mutably between requests.
//!
//! TODO: Answer oversized bodies with 413 instead of 400 once errors carry a payload-size variant.

use std::io::Read;
use std::net::SocketAddr;

use serde::Serialize;
use serde_json::json;
use tiny_http::{Header, Method, Request, Response, Server};

use crate::align::RawInput;
use crate::common::error::{EligibilityError, EligibilityResult};
use crate::inference::{PredictionResult, Predictor};

use super::form::FormSpec;
use super::render;

/// Upper bound on accepted request bodies.
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

const HTML: &str = "text/html; charset=utf-8";
const JSON: &str = "application/json";

/// Transport-independent response produced by [`route`].
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn html(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: HTML,
            body,
        }
    }

    fn json(status: u16, value: &impl Serialize) -> Self {
        let body = serde_json::to_string(value)
            .unwrap_or_else(|e| format!("{{\"ok\":false,\"error\":\"serialization failed: {e}\"}}"));
        Self {
            status,
            content_type: JSON,
            body,
        }
    }
}

#[derive(Serialize)]
struct ApiSuccess<'a> {
    ok: bool,
    #[serde(flatten)]
    result: &'a PredictionResult,
    probability_percent: Option<f64>,
}

fn json_error(err: &EligibilityError) -> Reply {
    Reply::json(
        err.http_status(),
        &json!({
            "ok": false,
            "code": err.code() as u32,
            "kind": err.code().as_str(),
            "error": err.to_string(),
        }),
    )
}

/// Form server bound to a listening socket.
pub struct FormServer {
    server: Server,
    predictor: Predictor,
    form: FormSpec,
}

impl FormServer {
    pub fn bind(addr: &str, predictor: Predictor, form: FormSpec) -> EligibilityResult<Self> {
        let server = Server::http(addr).map_err(|e| {
            EligibilityError::Io(std::io::Error::other(format!("cannot bind {addr}: {e}")))
        })?;
        Ok(Self {
            server,
            predictor,
            form,
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve requests until the listener fails.
    pub fn run(&self) -> EligibilityResult<()> {
        if let Some(addr) = self.local_addr() {
            tracing::info!(%addr, "form server listening");
        }
        loop {
            self.serve_one()?;
        }
    }

    /// Block for the next request and answer it.
    pub fn serve_one(&self) -> EligibilityResult<()> {
        let request = self.server.recv()?;
        self.handle(request);
        Ok(())
    }

    fn handle(&self, mut request: Request) {
        let body = match request.body_length() {
            Some(len) if len as u64 > MAX_BODY_BYTES => Err(oversized_body()),
            _ => read_body(request.as_reader()),
        };

        let reply = match body {
            Ok(body) => route(
                &self.predictor,
                &self.form,
                request.method(),
                request.url(),
                &body,
            ),
            Err(err) => reject(&self.form, request.url(), &err),
        };

        tracing::debug!(
            method = %request.method(),
            url = request.url(),
            status = reply.status,
            "request handled"
        );

        let mut response = Response::from_string(reply.body).with_status_code(reply.status);
        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
            response = response.with_header(header);
        }
        if let Err(e) = request.respond(response) {
            tracing::warn!(error = %e, "failed to write response");
        }
    }
}

fn oversized_body() -> EligibilityError {
    EligibilityError::invalid(format!("request body exceeds {MAX_BODY_BYTES} bytes"))
}

/// Read the whole body, refusing anything past [`MAX_BODY_BYTES`] instead of cutting it.
fn read_body(reader: impl Read) -> EligibilityResult<Vec<u8>> {
    let mut body = Vec::new();
    reader.take(MAX_BODY_BYTES + 1).read_to_end(&mut body)?;
    if body.len() as u64 > MAX_BODY_BYTES {
        return Err(oversized_body());
    }
    Ok(body)
}

/// Error reply for a request that never reached [`route`]; form posts get HTML.
fn reject(form: &FormSpec, url: &str, err: &EligibilityError) -> Reply {
    tracing::warn!(error = %err, url, "request rejected");
    match url.split('?').next() {
        Some("/predict") => Reply::html(err.http_status(), render::render_error(form, err, None)),
        _ => json_error(err),
    }
}

/// Dispatch one request. Pure with respect to the network, which keeps it testable.
pub fn route(
    predictor: &Predictor,
    form: &FormSpec,
    method: &Method,
    url: &str,
    body: &[u8],
) -> Reply {
    let path = url.split('?').next().unwrap_or(url);
    match (method, path) {
        (Method::Get, "/") => Reply::html(200, render::render_form(form, None)),
        (Method::Post, "/predict") => predict_form(predictor, form, body),
        (Method::Post, "/api/predict") => predict_json(predictor, body),
        (Method::Get, "/health") => Reply::json(
            200,
            &json!({
                "ok": true,
                "model": predictor.metadata(),
                "schema_len": predictor.schema().len(),
            }),
        ),
        (Method::Get, "/api/schema") => Reply::json(200, predictor.schema()),
        (_, "/" | "/predict" | "/api/predict" | "/health" | "/api/schema") => {
            Reply::json(405, &json!({"ok": false, "error": "method not allowed"}))
        }
        _ => Reply::json(404, &json!({"ok": false, "error": "not found"})),
    }
}

fn predict_form(predictor: &Predictor, form: &FormSpec, body: &[u8]) -> Reply {
    let input = match form.collect_urlencoded(body) {
        Ok(input) => input,
        Err(err) => {
            return Reply::html(err.http_status(), render::render_error(form, &err, None));
        }
    };
    match predictor.predict(&input) {
        Ok(result) => Reply::html(200, render::render_result(form, &result, &input)),
        Err(err) => {
            tracing::warn!(error = %err, code = err.code().as_str(), "prediction failed");
            Reply::html(err.http_status(), render::render_error(form, &err, Some(&input)))
        }
    }
}

fn predict_json(predictor: &Predictor, body: &[u8]) -> Reply {
    let input: RawInput = match serde_json::from_slice(body) {
        Ok(input) => input,
        Err(e) => {
            return json_error(&EligibilityError::invalid(format!("malformed JSON body: {e}")));
        }
    };
    match predictor.predict(&input) {
        Ok(result) => Reply::json(
            200,
            &ApiSuccess {
                ok: true,
                probability_percent: result.probability_percent(),
                result: &result,
            },
        ),
        Err(err) => {
            tracing::warn!(error = %err, code = err.code().as_str(), "prediction failed");
            json_error(&err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::domain::{ArtifactSource, ArtifactSources};
    use crate::model::service::assemble;

    const MODEL: &str = r#"{
        "model_id": "log_reg",
        "model_version": "1.0.0",
        "feature_names": ["age", "revenu", "montant_loan", "credits_existants",
                          "historique_credit_Bon", "historique_credit_Mauvais"],
        "estimator": {"kind": "logistic", "weights": [0, 0, 0, 0, 3.0, -3.0], "bias": 0.0}
    }"#;

    fn predictor() -> Predictor {
        let sources = ArtifactSources {
            model: ArtifactSource::new("model.json", MODEL.as_bytes()),
            scaler: None,
            features: None,
        };
        Predictor::new(assemble(&sources).unwrap())
    }

    const FORM_BODY: &str = "age=30&revenu=3000&montant_loan=5000&credits_existants=1\
        &historique_credit=Bon&logement=Locataire&emploi=Qualifi%C3%A9&epargne=Faible&objet=Voiture";

    #[test]
    fn index_serves_form() {
        let reply = route(&predictor(), &FormSpec::default(), &Method::Get, "/", b"");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, HTML);
        assert!(reply.body.contains("<form"));
    }

    #[test]
    fn form_submission_renders_verdict() {
        let reply = route(
            &predictor(),
            &FormSpec::default(),
            &Method::Post,
            "/predict",
            FORM_BODY.as_bytes(),
        );
        assert_eq!(reply.status, 200);
        assert!(reply.body.contains("<code>GOOD</code>"));
        // Selectors the model has no indicator columns for are ignored with a warning.
        assert!(reply.body.contains("column `logement_Locataire` is unknown to the model"));
        assert!(!reply.body.contains("not seen during training"));
    }

    #[test]
    fn invalid_form_is_a_bad_request() {
        let body = FORM_BODY.replace("age=30", "age=12");
        let reply = route(
            &predictor(),
            &FormSpec::default(),
            &Method::Post,
            "/predict",
            body.as_bytes(),
        );
        assert_eq!(reply.status, 400);
        assert!(reply.body.contains("Erreur"));
    }

    #[test]
    fn json_api_returns_probability() {
        let reply = route(
            &predictor(),
            &FormSpec::default(),
            &Method::Post,
            "/api/predict",
            br#"{"age": 30, "revenu": 3000, "historique_credit": "Mauvais", "montant_loan": 5000}"#,
        );
        assert_eq!(reply.status, 200);
        let value: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(value["verdict"], "BAD");
        assert!(value["probability"].as_f64().unwrap() < 0.1);
        assert_eq!(value["warnings"][0]["kind"], "missing_column");
    }

    #[test]
    fn json_api_rejects_garbage() {
        let reply = route(
            &predictor(),
            &FormSpec::default(),
            &Method::Post,
            "/api/predict",
            b"not json",
        );
        assert_eq!(reply.status, 400);
        let value: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(value["kind"], "invalid_input");
    }

    #[test]
    fn json_api_reports_inference_failure() {
        let raw = r#"{"model_id": "overflow", "feature_names": ["a", "b"],
            "estimator": {"kind": "logistic", "weights": [1e308, 1e308], "bias": 0.0}}"#;
        let sources = ArtifactSources {
            model: ArtifactSource::new("model.json", raw.as_bytes()),
            scaler: None,
            features: None,
        };
        let predictor = Predictor::new(assemble(&sources).unwrap());
        let reply = route(
            &predictor,
            &FormSpec::default(),
            &Method::Post,
            "/api/predict",
            br#"{"a": 1e308, "b": 1e308}"#,
        );
        assert_eq!(reply.status, 500);
        let value: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(value["ok"], false);
        assert_eq!(value["kind"], "inference");
        assert_eq!(value["code"], 3);
    }

    #[test]
    fn body_at_the_limit_is_read_whole() {
        let body = vec![b'a'; MAX_BODY_BYTES as usize];
        assert_eq!(read_body(body.as_slice()).unwrap().len(), body.len());
    }

    #[test]
    fn body_over_the_limit_is_refused() {
        let body = vec![b'a'; MAX_BODY_BYTES as usize + 1];
        let err = read_body(body.as_slice()).unwrap_err();
        assert!(matches!(err, EligibilityError::InvalidInput(_)));

        let reply = reject(&FormSpec::default(), "/predict", &err);
        assert_eq!(reply.status, 400);
        assert_eq!(reply.content_type, HTML);
        assert_eq!(reject(&FormSpec::default(), "/api/predict", &err).content_type, JSON);
    }

    #[test]
    fn health_reports_model() {
        let reply = route(&predictor(), &FormSpec::default(), &Method::Get, "/health?x=1", b"");
        let value: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(value["model"]["model_id"], "log_reg");
        assert_eq!(value["schema_len"], 6);
    }

    #[test]
    fn unknown_routes_and_methods() {
        let p = predictor();
        let form = FormSpec::default();
        assert_eq!(route(&p, &form, &Method::Get, "/nope", b"").status, 404);
        assert_eq!(route(&p, &form, &Method::Delete, "/predict", b"").status, 405);
    }
}
