use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

/// Mounted only when `DEBUG=true`.
pub fn docs_routes() -> Router<AppState> {
    Router::new().route("/docs", get(|| async { Json(openapi_document()) }))
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Error" } } }
    })
}

pub fn openapi_document() -> Value {
    let bearer = json!([{ "bearerAuth": [] }]);
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Secure Auth API",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": {
            "/": { "get": { "summary": "Liveness message", "responses": { "200": { "description": "ok" } } } },
            "/health": { "get": {
                "summary": "Database connectivity check",
                "responses": { "200": { "description": "healthy" }, "503": error_response("store unreachable") }
            } },
            "/register": { "post": {
                "summary": "Create an account",
                "requestBody": { "required": true, "content": { "application/json": {
                    "schema": { "$ref": "#/components/schemas/RegisterRequest" } } } },
                "responses": {
                    "201": { "description": "created", "content": { "application/json": {
                        "schema": { "$ref": "#/components/schemas/User" } } } },
                    "400": error_response("validation failed"),
                    "409": error_response("email already registered")
                }
            } },
            "/login": { "post": {
                "summary": "Exchange credentials for a bearer token",
                "requestBody": { "required": true, "content": { "application/json": {
                    "schema": { "$ref": "#/components/schemas/LoginRequest" } } } },
                "responses": {
                    "200": { "description": "token issued", "content": { "application/json": {
                        "schema": { "$ref": "#/components/schemas/Token" } } } },
                    "401": error_response("incorrect email or password")
                }
            } },
            "/profile": { "get": {
                "summary": "Caller's public profile",
                "security": bearer.clone(),
                "responses": {
                    "200": { "description": "profile", "content": { "application/json": {
                        "schema": { "$ref": "#/components/schemas/User" } } } },
                    "401": error_response("missing, invalid or expired token")
                }
            } },
            "/secure-data": { "get": {
                "summary": "Example protected payload",
                "security": bearer,
                "responses": { "200": { "description": "payload" }, "401": error_response("missing, invalid or expired token") }
            } }
        },
        "components": {
            "securitySchemes": { "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" } },
            "schemas": {
                "RegisterRequest": { "type": "object", "required": ["email", "password", "full_name"], "properties": {
                    "email": { "type": "string", "format": "email" },
                    "password": { "type": "string", "minLength": 8 },
                    "full_name": { "type": "string" }
                } },
                "LoginRequest": { "type": "object", "required": ["email", "password"], "properties": {
                    "email": { "type": "string", "format": "email" },
                    "password": { "type": "string" }
                } },
                "User": { "type": "object", "properties": {
                    "id": { "type": "string", "format": "uuid" },
                    "email": { "type": "string" },
                    "full_name": { "type": "string" },
                    "created_at": { "type": "string", "format": "date-time" }
                } },
                "Token": { "type": "object", "properties": {
                    "access_token": { "type": "string" },
                    "token_type": { "type": "string", "enum": ["bearer"] }
                } },
                "Error": { "type": "object", "properties": {
                    "error": { "type": "string" },
                    "status_code": { "type": "integer" }
                } }
            }
        }
    })
}
