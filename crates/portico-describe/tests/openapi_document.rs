// crates/portico-describe/tests/openapi_document.rs
// ============================================================================
// Module: OpenAPI Document Tests
// Description: End-to-end OpenAPI 2.0 document generation tests.
// Purpose: Assert full-document equality for a representative service.
// Dependencies: portico-core, portico-describe, serde_json
// ============================================================================

//! ## Overview
//! Drives the OpenAPI generator over a complete service descriptor and
//! asserts the entire rendered document, covering parameter placement,
//! schema definitions, security naming, and mixed-batch failure modes.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use portico_core::ApiDescriptor;
use portico_core::Audiences;
use portico_core::ConfigurationError;
use portico_core::FieldDescriptor;
use portico_core::FieldVariant;
use portico_core::MessageType;
use portico_core::MethodDescriptor;
use portico_core::RequestSpec;
use portico_core::ResourceContainer;
use portico_core::ResponseSpec;
use portico_core::ServiceDescriptor;
use portico_core::TypeRegistry;
use portico_describe::DescribeError;
use portico_describe::OpenApiGenerator;
use serde_json::json;

/// Registry with the shelf message used by the books service.
fn books_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .add_message(MessageType::new("BooksLib.Shelf").with_fields(vec![
            FieldDescriptor::scalar("name", 1, FieldVariant::String).required(),
            FieldDescriptor::scalar("pages", 2, FieldVariant::Int32),
        ]))
        .expect("register Shelf");
    registry
}

/// Books service: one container GET with a path parameter and one POST
/// with a body, audience restriction, and API-key requirement.
fn books_service() -> ServiceDescriptor {
    let api = ApiDescriptor::new("books", "v1", "books.appspot.com").with_description("Books API.");
    let get_shelf = MethodDescriptor::new("shelves.get", "GET", "shelves/{shelf}", "get_shelf")
        .with_request(RequestSpec::Container(ResourceContainer {
            body: None,
            params: vec![FieldDescriptor::scalar("shelf", 1, FieldVariant::String)],
        }))
        .with_response(ResponseSpec::Message("BooksLib.Shelf".to_string()));
    let mut insert_shelf = MethodDescriptor::new("shelves.insert", "POST", "shelves", "insert_shelf")
        .with_request(RequestSpec::Message("BooksLib.Shelf".to_string()));
    insert_shelf.audiences = Some(Audiences::Legacy(vec!["books-aud".to_string()]));
    insert_shelf.api_key_required = Some(true);
    ServiceDescriptor::new("BooksService", api, vec![get_shelf, insert_shelf])
}

#[test]
fn books_service_renders_expected_document() {
    let doc = OpenApiGenerator::new()
        .generate(&[books_service()], &books_registry())
        .expect("generate");

    let expected = json!({
        "basePath": "/_ah/api",
        "consumes": ["application/json"],
        "definitions": {
            "BooksLibShelf": {
                "properties": {
                    "name": { "type": "string" },
                    "pages": { "format": "int32", "type": "integer" },
                },
                "required": ["name"],
                "type": "object",
            },
        },
        "host": "books.appspot.com",
        "info": {
            "description": "Books API.",
            "title": "books",
            "version": "v1",
        },
        "paths": {
            "/books/v1/shelves": {
                "post": {
                    "operationId": "BooksService_insertShelf",
                    "parameters": [
                        {
                            "in": "body",
                            "name": "body",
                            "schema": { "$ref": "#/definitions/BooksLibShelf" },
                        },
                    ],
                    "responses": {
                        "200": { "description": "A successful response" },
                    },
                    "security": [
                        { "api_key": [], "google_id_token-13a9a1ee": [] },
                    ],
                },
            },
            "/books/v1/shelves/{shelf}": {
                "get": {
                    "operationId": "BooksService_getShelf",
                    "parameters": [
                        {
                            "in": "path",
                            "name": "shelf",
                            "required": true,
                            "type": "string",
                        },
                    ],
                    "responses": {
                        "200": {
                            "description": "A successful response",
                            "schema": { "$ref": "#/definitions/BooksLibShelf" },
                        },
                    },
                },
            },
        },
        "produces": ["application/json"],
        "schemes": ["https"],
        "securityDefinitions": {
            "api_key": {
                "in": "query",
                "name": "key",
                "type": "apiKey",
            },
            "google_id_token": {
                "authorizationUrl": "",
                "flow": "implicit",
                "type": "oauth2",
                "x-google-issuer": "https://accounts.google.com",
                "x-google-jwks_uri": "https://www.googleapis.com/oauth2/v3/certs",
            },
            "google_id_token-13a9a1ee": {
                "authorizationUrl": "",
                "flow": "implicit",
                "type": "oauth2",
                "x-google-audiences": "books-aud",
                "x-google-issuer": "https://accounts.google.com",
                "x-google-jwks_uri": "https://www.googleapis.com/oauth2/v3/certs",
            },
        },
        "swagger": "2.0",
    });
    assert_eq!(doc, expected);
}

#[test]
fn plain_message_body_method_surfaces_path_fields_as_parameters() {
    let mut registry = TypeRegistry::new();
    registry
        .add_message(MessageType::new("Root.ItemsPutRequest").with_fields(vec![
            FieldDescriptor::scalar("title", 1, FieldVariant::String),
            FieldDescriptor::scalar("entryId", 2, FieldVariant::String).required(),
        ]))
        .expect("register ItemsPutRequest");

    let api = ApiDescriptor::new("root", "v1", "example.appspot.com");
    let method = MethodDescriptor::new("entries.items.put", "POST", "entries/{entryId}/items", "items_put")
        .with_request(RequestSpec::Message("Root.ItemsPutRequest".to_string()));
    let service = ServiceDescriptor::new("MyService", api, vec![method]);

    let doc = OpenApiGenerator::new().generate(&[service], &registry).expect("generate");
    assert_eq!(
        doc["paths"]["/root/v1/entries/{entryId}/items"]["post"]["parameters"],
        json!([
            {
                "in": "path",
                "name": "entryId",
                "required": true,
                "type": "string",
            },
            {
                "in": "body",
                "name": "body",
                "schema": { "$ref": "#/definitions/RootItemsPutRequest" },
            },
        ])
    );
    // The body schema keeps every field, including the path-mapped one.
    assert_eq!(
        doc["definitions"]["RootItemsPutRequest"]["required"],
        json!(["entryId"])
    );
}

#[test]
fn mixed_versions_in_one_batch_fail_loudly() {
    let v1 = ServiceDescriptor::new(
        "V1Service",
        ApiDescriptor::new("iata", "v1", "example.appspot.com"),
        vec![MethodDescriptor::new("list_airports", "GET", "airports", "list_airports")],
    );
    let v2 = ServiceDescriptor::new(
        "V2Service",
        ApiDescriptor::new("iata", "v2", "example.appspot.com"),
        vec![MethodDescriptor::new("list_airports", "GET", "airports", "list_airports")],
    );
    let err = OpenApiGenerator::new()
        .generate(&[v1, v2], &TypeRegistry::new())
        .expect_err("mixed versions");
    let DescribeError::Configuration(ConfigurationError::MultipleApiVersions(listed)) = err else {
        panic!("unexpected error kind");
    };
    assert_eq!(listed, r#"[("iata", "v1"), ("iata", "v2")]"#);
}

#[test]
fn two_classes_one_api_merge_into_one_document() {
    let mut registry = TypeRegistry::new();
    registry
        .add_message(MessageType::new("Iata.Airport").with_fields(vec![
            FieldDescriptor::scalar("iata", 1, FieldVariant::String).required(),
            FieldDescriptor::scalar("name", 2, FieldVariant::String).required(),
        ]))
        .expect("register Airport");

    let api = ApiDescriptor::new("iata", "v1", "iata.appspot.com");
    let part1 = ServiceDescriptor::new(
        "ServicePart1",
        api.clone(),
        vec![
            MethodDescriptor::new("list_airports", "GET", "airports", "list_airports")
                .with_response(ResponseSpec::Message("Iata.Airport".to_string())),
        ],
    );
    let part2 = ServiceDescriptor::new(
        "ServicePart2",
        api,
        vec![
            MethodDescriptor::new("get_airport", "GET", "airport/{iata}", "get_airport")
                .with_request(RequestSpec::Container(ResourceContainer {
                    body: None,
                    params: vec![FieldDescriptor::scalar("iata", 1, FieldVariant::String).required()],
                }))
                .with_response(ResponseSpec::Message("Iata.Airport".to_string())),
        ],
    );

    let doc = OpenApiGenerator::new().generate(&[part1, part2], &registry).expect("generate");
    let paths = doc["paths"].as_object().expect("paths");
    let keys: Vec<&str> = paths.keys().map(String::as_str).collect();
    assert_eq!(keys, ["/iata/v1/airport/{iata}", "/iata/v1/airports"]);
    assert_eq!(
        paths["/iata/v1/airports"]["get"]["operationId"],
        json!("ServicePart1_listAirports")
    );
    assert_eq!(
        paths["/iata/v1/airport/{iata}"]["get"]["operationId"],
        json!("ServicePart2_getAirport")
    );
}
