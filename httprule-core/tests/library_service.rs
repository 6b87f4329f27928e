//! A small "library" API used across the integration tests.
//!
//! The descriptor set is built at runtime. `prost_types::MethodOptions` has no room for
//! extensions, so the descriptor messages needed to attach `google.api.http` rules are
//! mirrored here and encoded by hand.
#![allow(dead_code)]

use bytes::Bytes;
use httprule_core::{
    BoxError,
    rule::{HttpRule, http_rule::Pattern},
    transport::HttpClient,
};
use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, MethodDescriptor};
use prost_types::{
    DescriptorProto, FieldDescriptorProto,
    field_descriptor_proto::{Label, Type},
};
use std::sync::{Arc, Mutex};

pub const SERVER: &str = "http://library.test";
pub const SERVICE: &str = "library.Library";

#[derive(Clone, PartialEq, Message)]
struct FileSetProto {
    #[prost(message, repeated, tag = "1")]
    file: Vec<FileProto>,
}

#[derive(Clone, PartialEq, Message)]
struct FileProto {
    #[prost(string, tag = "1")]
    name: String,
    #[prost(string, tag = "2")]
    package: String,
    #[prost(message, repeated, tag = "4")]
    message_type: Vec<DescriptorProto>,
    #[prost(message, repeated, tag = "6")]
    service: Vec<ServiceProto>,
    #[prost(string, tag = "12")]
    syntax: String,
}

#[derive(Clone, PartialEq, Message)]
struct ServiceProto {
    #[prost(string, tag = "1")]
    name: String,
    #[prost(message, repeated, tag = "2")]
    method: Vec<MethodProto>,
}

#[derive(Clone, PartialEq, Message)]
struct MethodProto {
    #[prost(string, tag = "1")]
    name: String,
    #[prost(string, tag = "2")]
    input_type: String,
    #[prost(string, tag = "3")]
    output_type: String,
    #[prost(message, optional, tag = "4")]
    options: Option<MethodOptionsProto>,
    #[prost(bool, tag = "5")]
    client_streaming: bool,
    #[prost(bool, tag = "6")]
    server_streaming: bool,
}

#[derive(Clone, PartialEq, Message)]
struct MethodOptionsProto {
    #[prost(message, optional, tag = "72295728")]
    http: Option<HttpRule>,
}

fn json_name(name: &str) -> String {
    let mut out = String::new();
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn field(name: &str, number: i32, ty: Type, type_name: Option<&str>) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        type_name: type_name.map(str::to_string),
        json_name: Some(json_name(name)),
        ..Default::default()
    }
}

fn repeated(mut field: FieldDescriptorProto) -> FieldDescriptorProto {
    field.label = Some(Label::Repeated as i32);
    field
}

fn message(name: &str, field: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field,
        ..Default::default()
    }
}

fn method(name: &str, input: &str, output: &str, rule: Option<HttpRule>) -> MethodProto {
    MethodProto {
        name: name.to_string(),
        input_type: format!(".library.{input}"),
        output_type: format!(".library.{output}"),
        options: rule.map(|rule| MethodOptionsProto { http: Some(rule) }),
        client_streaming: false,
        server_streaming: false,
    }
}

fn rule(pattern: Pattern, body: &str) -> Option<HttpRule> {
    Some(HttpRule {
        pattern: Some(pattern),
        body: body.to_string(),
        ..Default::default()
    })
}

/// ```proto
/// service Library {
///   rpc GetBook(GetBookRequest) returns (Book) { get: "/v1/{name=shelves/*/books/*}" }
///   rpc ListBooks(ListBooksRequest) returns (ListBooksResponse) { get: "/v1/{parent=shelves/*}/books" }
///   rpc CreateBook(CreateBookRequest) returns (Book) { post: "/v1/{parent=shelves/*}/books" body: "*" }
///   rpc UpdateBook(UpdateBookRequest) returns (Book) { put: "/v1/{book.name=shelves/*/books/*}" body: "*" }
///   rpc DeleteBook(GetBookRequest) returns (Book) { delete: "/v1/{name=shelves/*/books/*}" }
///   rpc PublishBook(GetBookRequest) returns (Book) { post: "/v1/{name=shelves/*/books/*}:publish" body: "*" }
///   rpc PatchBook(UpdateBookRequest) returns (Book) { patch: "/v1/{book.name=shelves/*/books/*}" body: "*" }
///   rpc ArchiveBook(GetBookRequest) returns (Book);
///   rpc WatchBooks(ListBooksRequest) returns (stream Book) { get: "/v1/books:watch" }
///   rpc ImportBooks(stream Book) returns (ListBooksResponse) { post: "/v1/books:import" body: "*" }
/// }
/// ```
pub fn library_pool() -> DescriptorPool {
    let messages = vec![
        message(
            "Book",
            vec![
                field("name", 1, Type::String, None),
                field("title", 2, Type::String, None),
                field("pages", 3, Type::Int32, None),
                repeated(field("tags", 4, Type::String, None)),
            ],
        ),
        message("GetBookRequest", vec![field("name", 1, Type::String, None)]),
        message("Filter", vec![field("author", 1, Type::String, None)]),
        message(
            "ListBooksRequest",
            vec![
                field("parent", 1, Type::String, None),
                field("page_size", 2, Type::Int32, None),
                field("filter", 3, Type::Message, Some(".library.Filter")),
            ],
        ),
        message(
            "ListBooksResponse",
            vec![repeated(field("books", 1, Type::Message, Some(".library.Book")))],
        ),
        message(
            "CreateBookRequest",
            vec![
                field("parent", 1, Type::String, None),
                field("book", 2, Type::Message, Some(".library.Book")),
            ],
        ),
        message(
            "UpdateBookRequest",
            vec![field("book", 1, Type::Message, Some(".library.Book"))],
        ),
    ];

    let book_path = "/v1/{name=shelves/*/books/*}".to_string();
    let update_path = "/v1/{book.name=shelves/*/books/*}".to_string();
    let shelf_books = "/v1/{parent=shelves/*}/books".to_string();

    let mut watch = method(
        "WatchBooks",
        "ListBooksRequest",
        "Book",
        rule(Pattern::Get("/v1/books:watch".to_string()), ""),
    );
    watch.server_streaming = true;

    let mut import = method(
        "ImportBooks",
        "Book",
        "ListBooksResponse",
        rule(Pattern::Post("/v1/books:import".to_string()), "*"),
    );
    import.client_streaming = true;

    let methods = vec![
        method(
            "GetBook",
            "GetBookRequest",
            "Book",
            rule(Pattern::Get(book_path.clone()), ""),
        ),
        method(
            "ListBooks",
            "ListBooksRequest",
            "ListBooksResponse",
            rule(Pattern::Get(shelf_books.clone()), ""),
        ),
        method(
            "CreateBook",
            "CreateBookRequest",
            "Book",
            rule(Pattern::Post(shelf_books), "*"),
        ),
        method(
            "UpdateBook",
            "UpdateBookRequest",
            "Book",
            rule(Pattern::Put(update_path.clone()), "*"),
        ),
        method(
            "DeleteBook",
            "GetBookRequest",
            "Book",
            rule(Pattern::Delete(book_path.clone()), ""),
        ),
        method(
            "PublishBook",
            "GetBookRequest",
            "Book",
            rule(Pattern::Post(format!("{book_path}:publish")), "*"),
        ),
        method(
            "PatchBook",
            "UpdateBookRequest",
            "Book",
            rule(Pattern::Patch(update_path), "*"),
        ),
        method("ArchiveBook", "GetBookRequest", "Book", None),
        watch,
        import,
    ];

    let set = FileSetProto {
        file: vec![FileProto {
            name: "library.proto".to_string(),
            package: "library".to_string(),
            message_type: messages,
            service: vec![ServiceProto {
                name: "Library".to_string(),
                method: methods,
            }],
            syntax: "proto3".to_string(),
        }],
    };

    DescriptorPool::decode(set.encode_to_vec().as_slice()).expect("Failed to decode library pool")
}

pub fn library_method(pool: &DescriptorPool, name: &str) -> MethodDescriptor {
    pool.get_service_by_name(SERVICE)
        .expect("Library service not found")
        .methods()
        .find(|m| m.name() == name)
        .expect("Method not found")
}

pub fn input(method: &MethodDescriptor, body: serde_json::Value) -> DynamicMessage {
    DynamicMessage::deserialize(method.input(), body).expect("Invalid input message")
}

/// A request as seen by the fake HTTP client.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: http::Method,
    pub uri: String,
    pub headers: http::HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn url(&self) -> url::Url {
        url::Url::parse(&self.uri).expect("Invalid request uri")
    }

    /// Query pairs, sorted.
    pub fn query(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = self.url().query_pairs().into_owned().collect();
        pairs.sort();
        pairs
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.to_str().unwrap())
    }

    /// Every value sent under `name`, in order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("Request body is not JSON")
    }
}

type Responder =
    Arc<dyn Fn(&RecordedRequest) -> Result<http::Response<Bytes>, BoxError> + Send + Sync>;

/// An in-memory [`HttpClient`] that records requests and answers them with `responder`.
#[derive(Clone)]
pub struct FakeHttpClient {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responder: Responder,
}

impl FakeHttpClient {
    pub fn new(
        responder: impl Fn(&RecordedRequest) -> Result<http::Response<Bytes>, BoxError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            requests: Arc::default(),
            responder: Arc::new(responder),
        }
    }

    /// Answers every request with the same response.
    pub fn respond(status: u16, headers: &[(&str, &str)], body: &str) -> Self {
        let headers: Vec<(String, String)> = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let body = body.to_string();

        Self::new(move |_| {
            let mut builder = http::Response::builder().status(status);
            for (key, value) in &headers {
                builder = builder.header(key.as_str(), value.as_str());
            }
            Ok(builder.body(Bytes::from(body.clone()))?)
        })
    }

    pub fn fail(message: &'static str) -> Self {
        Self::new(move |_| Err(message.into()))
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpClient for FakeHttpClient {
    async fn send(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>, BoxError> {
        let (parts, body) = request.into_parts();
        let recorded = RecordedRequest {
            method: parts.method,
            uri: parts.uri.to_string(),
            headers: parts.headers,
            body,
        };

        let response = (self.responder)(&recorded);
        self.requests.lock().unwrap().push(recorded);
        response
    }
}
