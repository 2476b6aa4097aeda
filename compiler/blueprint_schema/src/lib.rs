//! The schema used to describe a Blueprint operation catalog and its
//! middleware registration.
//!
//! Values of these types are handed to `blueprint_codegen` by the host at
//! start-up. They are immutable from the moment the catalog is built: the
//! codegen engine never mutates a [`Blueprint`], it only reads from it.
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A fully-qualified reference to a Rust type, opaque to the source writer
/// beyond what's needed to render a valid path expression.
///
/// Reflection is deliberately out of scope: the host builds a `TypeId` once,
/// up front, from types it already knows about (see spec.md's "Runtime
/// reflection → build-time generation" redesign note) rather than
/// discovering it via `rustdoc` or proc-macro introspection at codegen time.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TypeId {
    /// The fully-qualified path, e.g. `["myapp", "operations", "CreateUser"]`.
    pub path: Vec<String>,
    /// Generic arguments, in declaration order. Empty for a non-generic type.
    pub generic_arguments: Vec<TypeId>,
}

impl TypeId {
    pub fn new(path: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            generic_arguments: Vec::new(),
        }
    }

    pub fn with_generics(mut self, generic_arguments: Vec<TypeId>) -> Self {
        self.generic_arguments = generic_arguments;
        self
    }

    /// The simple (last-segment) name of the type, e.g. `CreateUser`.
    pub fn simple_name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or("")
    }

    pub fn is_generic(&self) -> bool {
        !self.generic_arguments.is_empty()
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.join("::"))?;
        if self.is_generic() {
            write!(f, "<")?;
            for (i, g) in self.generic_arguments.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{g}")?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

/// Where a property's value is sourced from, on an incoming request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePart {
    Header,
    Query,
    Cookie,
    Body,
    Route,
}

/// One typed property of an operation's payload.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub type_: TypeId,
    pub is_nullable: bool,
    pub source: SourcePart,
}

/// The broad category a response belongs to, used by the exception-handling
/// frame and by validation short-circuiting to pick a result variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseCategory {
    Success,
    ClientError,
    ServerError,
    Validation,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ResponseDescriptor {
    pub status_code: u16,
    pub payload_type: TypeId,
    pub category: ResponseCategory,
}

/// A feature-specific bag of configuration, keyed by feature kind (e.g.
/// `"rate_limit"`, `"idempotency_key"`). Builders read from here instead of
/// growing `OperationDescriptor` with one field per optional feature.
pub type FeatureBag = IndexMap<String, serde_json::Value>;

/// Immutable, built-once description of a single API operation.
///
/// Lifecycle: constructed by the host from its declared catalog at
/// start-up, read-only for the rest of the process's life.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// A stable name for the operation, unique within the catalog.
    pub name: String,
    pub payload_type: TypeId,
    pub properties: Vec<PropertyDescriptor>,
    pub responses: Vec<ResponseDescriptor>,
    #[serde(default)]
    pub features: FeatureBag,
    pub requires_return_value: bool,
    /// Route/link templates bound to this operation, opaque to the codegen
    /// engine (interpreted by the router adapter, an external collaborator).
    #[serde(default)]
    pub link_templates: Vec<String>,
    /// If set, this operation's payload type is a supertype of one or more
    /// other operations' payload types in the catalog (polymorphic
    /// dispatch, see spec.md §4.9 and the "Polymorphic handler order"
    /// testable property).
    #[serde(default)]
    pub base_operation: Option<String>,
}

impl OperationDescriptor {
    /// The payload type of this operation's success response, if it
    /// declares one — the type a `RequiresReturnValue` operation's
    /// Execution-stage result variable is minted as.
    pub fn success_response_type(&self) -> Option<TypeId> {
        self.responses
            .iter()
            .find(|r| r.category == ResponseCategory::Success)
            .map(|r| r.payload_type.clone())
    }
}

/// The fixed ordering of middleware contribution. Declared
/// `#[non_exhaustive]`, matching the way the teacher marks its own
/// closed-but-growable schema enums (`Lint`, `CloningPolicy`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum MiddlewareStage {
    Setup,
    Authentication,
    Authorisation,
    Validation,
    OperationChecks,
    PreExecute,
    Execution,
    PostExecute,
    Teardown,
}

impl MiddlewareStage {
    /// All stages, in pipeline order.
    pub const ALL: [MiddlewareStage; 9] = [
        MiddlewareStage::Setup,
        MiddlewareStage::Authentication,
        MiddlewareStage::Authorisation,
        MiddlewareStage::Validation,
        MiddlewareStage::OperationChecks,
        MiddlewareStage::PreExecute,
        MiddlewareStage::Execution,
        MiddlewareStage::PostExecute,
        MiddlewareStage::Teardown,
    ];
}

impl fmt::Display for MiddlewareStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MiddlewareStage::Setup => "setup",
            MiddlewareStage::Authentication => "authentication",
            MiddlewareStage::Authorisation => "authorisation",
            MiddlewareStage::Validation => "validation",
            MiddlewareStage::OperationChecks => "operation_checks",
            MiddlewareStage::PreExecute => "pre_execute",
            MiddlewareStage::Execution => "execution",
            MiddlewareStage::PostExecute => "post_execute",
            MiddlewareStage::Teardown => "teardown",
        };
        f.write_str(s)
    }
}

/// The lifetime of a DI-managed service, as reported by the service
/// resolver. Named after, and kept at the same arity as, the teacher's own
/// `pavex_bp_schema::Lifecycle` (`RequestScoped` covers the spec's "scoped").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Singleton,
    RequestScoped,
    Transient,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Singleton => write!(f, "singleton"),
            Lifecycle::RequestScoped => write!(f, "request-scoped"),
            Lifecycle::Transient => write!(f, "transient"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationLevel {
    Debug,
    Release,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileStrategy {
    InMemory,
    ToDisk,
}

/// One crate generated source needs linked in when it's compiled — spec.md
/// §4.8's "references the closure of assemblies". `blueprint_runtime` itself
/// is always one of these, since every generated executor implements its
/// `Executor` trait and takes a `&dyn Scope` parameter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternCrate {
    pub name: String,
    /// Filesystem path to the crate's compiled `.rlib`, as the host resolved
    /// it (e.g. from its own `target/` directory) — `blueprint_codegen`
    /// doesn't invoke Cargo itself to discover this.
    pub rlib_path: String,
}

/// Host-supplied configuration for one generation run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlueprintConfig {
    pub app_name: String,
    /// Must be unique per generation, to avoid assembly-load conflicts when
    /// the same process regenerates more than once (e.g. in tests).
    pub assembly_name: String,
    pub optimization_level: OptimizationLevel,
    pub compile_strategy: CompileStrategy,
    /// The rlibs the generated source's `rustc` invocation must be able to
    /// resolve via `--extern`. Empty by default (the `InMemory` test
    /// strategy never actually shells out to `rustc`), but any `ToDisk` run
    /// that links against `blueprint_runtime` types needs at least one entry
    /// here.
    #[serde(default)]
    pub extern_crates: Vec<ExternCrate>,
}

/// The full operation catalog handed to the codegen engine at start-up.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OperationCatalog {
    pub operations: Vec<OperationDescriptor>,
}

impl OperationCatalog {
    pub fn push(&mut self, operation: OperationDescriptor) -> &mut Self {
        self.operations.push(operation);
        self
    }
}

/// One concrete type registered against a requested service type (usually a
/// trait object, e.g. `dyn Injectable`). A requested type with more than one
/// registration is resolved at runtime rather than lifted into a field (spec
/// §4.6, "Multiple impls").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceRegistration {
    pub concrete_type: TypeId,
    pub lifecycle: Lifecycle,
}

/// The set of services the host has registered with its DI container,
/// indexed by the type operations ask for. Read-only input to the DI-aware
/// instance frame provider (`blueprint_codegen::di`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServiceCatalog {
    pub registrations: IndexMap<TypeId, Vec<ServiceRegistration>>,
}

impl ServiceCatalog {
    pub fn register(&mut self, requested_type: TypeId, registration: ServiceRegistration) -> &mut Self {
        self.registrations.entry(requested_type).or_default().push(registration);
        self
    }

    pub fn lookup(&self, requested_type: &TypeId) -> &[ServiceRegistration] {
        self.registrations
            .get(requested_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
