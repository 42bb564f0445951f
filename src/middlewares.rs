use actix_web::middleware::{DefaultHeaders, Logger, NormalizePath, TrailingSlash};

pub(crate) fn logger() -> Logger {
    Logger::new(r#"%a "%r" %s %b %Dms"#)
}

// "/playlist/" reaches the same handler as "/playlist"
pub(crate) fn normalize_path() -> NormalizePath {
    NormalizePath::new(TrailingSlash::Trim)
}

pub(crate) fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
}
