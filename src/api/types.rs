use actix_web::body::BoxBody;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder};
use serde::Serialize;

/// `200 OK` with `{ "msg": .., "data": .. }`.
#[derive(Debug, Serialize)]
pub struct SuccessResult<T> {
    pub msg: String,
    pub data: T,
}

/// `{ "msg": .., "code": .. }` sent with an arbitrary status.
#[derive(Debug, Serialize)]
pub struct FailureResult {
    pub msg: String,
    #[serde(skip)]
    pub status: StatusCode,
    #[serde(rename = "code")]
    pub msg_code: &'static str,
}

pub const FAILURE: &str = "failure";

impl<T: Serialize> Responder for SuccessResult<T> {
    type Body = BoxBody;

    fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
        HttpResponse::Ok().json(self)
    }
}

impl Responder for FailureResult {
    type Body = BoxBody;

    fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
        HttpResponse::build(self.status).json(self)
    }
}

pub fn transform_request_on_msg(req: &HttpRequest) -> String {
    format!("{} {}", req.method(), req.uri())
}
