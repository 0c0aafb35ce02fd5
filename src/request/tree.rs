//! Upload and parameter trees.
//!
//! Hosts build one tree of uploaded files and one tree of request
//! parameters per request. Both are walked depth-first with an explicit
//! stack, so nesting depth is bounded only by memory.

use serde_json::{map, Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The atomic unit handed to a scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanLeaf<'a> {
    /// A parameter value.
    InlineBytes(&'a [u8]),
    /// An uploaded file's temporary storage path.
    FileReference(Option<&'a Path>),
}

/// One uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadedFile {
    /// Where the upload was stored on disk.
    pub tmp_path: Option<PathBuf>,
    /// Client-supplied filename.
    pub name: Option<String>,
}

impl UploadedFile {
    /// Creates an upload stored at `tmp_path`.
    pub fn new(tmp_path: impl Into<PathBuf>) -> Self {
        Self {
            tmp_path: Some(tmp_path.into()),
            name: None,
        }
    }

    /// Sets the client-supplied filename.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A tree of uploaded files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadNode {
    /// A single upload.
    File(UploadedFile),
    /// An ordered list of uploads.
    Sequence(Vec<UploadNode>),
    /// Uploads keyed by field name.
    Mapping(BTreeMap<String, UploadNode>),
}

impl Default for UploadNode {
    fn default() -> Self {
        Self::Sequence(Vec::new())
    }
}

impl UploadNode {
    /// Creates a file leaf stored at `tmp_path`.
    pub fn file(tmp_path: impl Into<PathBuf>) -> Self {
        Self::File(UploadedFile::new(tmp_path))
    }

    /// Returns the file leaves in depth-first order.
    pub fn leaves(&self) -> UploadLeaves<'_> {
        UploadLeaves { stack: vec![self] }
    }
}

impl From<Value> for UploadNode {
    /// Builds an upload tree from a decoded multipart file listing.
    ///
    /// An object carrying a `tmp_name` field describes uploads; if
    /// `tmp_name` is itself an array or object (multi-file fields), its
    /// structure is followed. Any other object or array is a collection.
    /// Scalars outside an upload description are ignored.
    fn from(value: Value) -> Self {
        convert(
            value,
            UploadContext::Field,
            upload_step,
            UploadNode::Sequence,
            UploadNode::Mapping,
        )
        .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
enum UploadContext {
    /// Inside the field listing.
    Field,
    /// Inside a `tmp_name` value, carrying the client filename if known.
    TmpName(Option<String>),
}

fn upload_step(value: Value, context: UploadContext) -> Step<UploadNode, UploadContext> {
    match context {
        UploadContext::Field => match value {
            Value::Object(mut fields) => match fields.remove("tmp_name") {
                Some(tmp_name) => {
                    let name = fields.get("name").and_then(Value::as_str).map(str::to_string);
                    upload_step(tmp_name, UploadContext::TmpName(name))
                }
                None => Step::Mapping(fields, UploadContext::Field),
            },
            Value::Array(items) => Step::Sequence(items, UploadContext::Field),
            _ => Step::Leaf(None),
        },
        UploadContext::TmpName(name) => match value {
            Value::String(path) => Step::Leaf(Some(UploadNode::File(UploadedFile {
                tmp_path: (!path.is_empty()).then(|| PathBuf::from(path)),
                name,
            }))),
            Value::Null => Step::Leaf(Some(UploadNode::File(UploadedFile {
                tmp_path: None,
                name,
            }))),
            Value::Array(items) => Step::Sequence(items, UploadContext::TmpName(None)),
            Value::Object(fields) => Step::Mapping(fields, UploadContext::TmpName(None)),
            Value::Bool(_) | Value::Number(_) => Step::Leaf(None),
        },
    }
}

/// Depth-first iterator over an upload tree's files.
#[derive(Debug)]
pub struct UploadLeaves<'a> {
    stack: Vec<&'a UploadNode>,
}

impl<'a> Iterator for UploadLeaves<'a> {
    type Item = ScanLeaf<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                UploadNode::File(file) => {
                    return Some(ScanLeaf::FileReference(file.tmp_path.as_deref()));
                }
                UploadNode::Sequence(children) => self.stack.extend(children.iter().rev()),
                UploadNode::Mapping(children) => self.stack.extend(children.values().rev()),
            }
        }
        None
    }
}

/// A tree of request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamNode {
    /// A single value.
    Scalar(Vec<u8>),
    /// An ordered list of values.
    Sequence(Vec<ParamNode>),
    /// Values keyed by parameter name.
    Mapping(BTreeMap<String, ParamNode>),
}

impl Default for ParamNode {
    fn default() -> Self {
        Self::Mapping(BTreeMap::new())
    }
}

impl ParamNode {
    /// Creates a scalar leaf.
    pub fn scalar(value: impl Into<Vec<u8>>) -> Self {
        Self::Scalar(value.into())
    }

    /// Returns the scalar leaves in depth-first order.
    pub fn leaves(&self) -> ParamLeaves<'_> {
        ParamLeaves { stack: vec![self] }
    }
}

impl<K: Into<String>, V: Into<ParamNode>> FromIterator<(K, V)> for ParamNode {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Mapping(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<&str> for ParamNode {
    fn from(value: &str) -> Self {
        Self::scalar(value)
    }
}

impl From<String> for ParamNode {
    fn from(value: String) -> Self {
        Self::scalar(value)
    }
}

impl From<Vec<u8>> for ParamNode {
    fn from(value: Vec<u8>) -> Self {
        Self::Scalar(value)
    }
}

impl From<Value> for ParamNode {
    /// Builds a parameter tree from decoded request parameters.
    ///
    /// Strings become their UTF-8 bytes, numbers and booleans their textual
    /// form, and `null` an empty value.
    fn from(value: Value) -> Self {
        convert(value, (), param_step, ParamNode::Sequence, ParamNode::Mapping).unwrap_or_default()
    }
}

fn param_step(value: Value, _: ()) -> Step<ParamNode, ()> {
    match value {
        Value::Null => Step::Leaf(Some(ParamNode::Scalar(Vec::new()))),
        Value::Bool(b) => Step::Leaf(Some(ParamNode::scalar(b.to_string()))),
        Value::Number(n) => Step::Leaf(Some(ParamNode::scalar(n.to_string()))),
        Value::String(s) => Step::Leaf(Some(ParamNode::scalar(s))),
        Value::Array(items) => Step::Sequence(items, ()),
        Value::Object(fields) => Step::Mapping(fields, ()),
    }
}

/// What one JSON value turns into during conversion.
enum Step<N, C> {
    /// A finished node, or nothing if the value is dropped.
    Leaf(Option<N>),
    /// A list whose items are converted under the given context.
    Sequence(Vec<Value>, C),
    /// An object whose values are converted under the given context.
    Mapping(Map<String, Value>, C),
}

/// A collection whose children are still being converted.
struct Frame<N, C> {
    context: C,
    kind: FrameKind<N>,
}

enum FrameKind<N> {
    Sequence(Vec<N>, std::vec::IntoIter<Value>),
    Mapping(BTreeMap<String, N>, map::IntoIter, Option<String>),
}

impl<N, C: Clone> Frame<N, C> {
    fn attach(&mut self, node: N) {
        match &mut self.kind {
            FrameKind::Sequence(items, _) => items.push(node),
            FrameKind::Mapping(items, _, key) => {
                if let Some(key) = key.take() {
                    items.insert(key, node);
                }
            }
        }
    }

    fn next_child(&mut self) -> Option<(Value, C)> {
        let context = &self.context;
        match &mut self.kind {
            FrameKind::Sequence(_, rest) => rest.next().map(|value| (value, context.clone())),
            FrameKind::Mapping(_, rest, key) => rest.next().map(|(name, value)| {
                *key = Some(name);
                (value, context.clone())
            }),
        }
    }

    fn finish(self, sequence: fn(Vec<N>) -> N, mapping: fn(BTreeMap<String, N>) -> N) -> N {
        match self.kind {
            FrameKind::Sequence(items, _) => sequence(items),
            FrameKind::Mapping(items, _, _) => mapping(items),
        }
    }
}

/// Converts a JSON value into a tree without native recursion.
///
/// Values are consumed as they are visited, so neither the input nor the
/// conversion itself needs stack space proportional to nesting depth.
fn convert<N, C: Clone>(
    root: Value,
    context: C,
    step: fn(Value, C) -> Step<N, C>,
    sequence: fn(Vec<N>) -> N,
    mapping: fn(BTreeMap<String, N>) -> N,
) -> Option<N> {
    let mut stack: Vec<Frame<N, C>> = Vec::new();
    let mut pending = Some((root, context));

    loop {
        let mut done = match pending.take() {
            Some((value, context)) => match step(value, context) {
                Step::Leaf(node) => node,
                Step::Sequence(items, context) => {
                    let kind = FrameKind::Sequence(Vec::with_capacity(items.len()), items.into_iter());
                    stack.push(Frame { context, kind });
                    None
                }
                Step::Mapping(fields, context) => {
                    let kind = FrameKind::Mapping(BTreeMap::new(), fields.into_iter(), None);
                    stack.push(Frame { context, kind });
                    None
                }
            },
            None => None,
        };

        loop {
            let Some(frame) = stack.last_mut() else {
                return done;
            };
            if let Some(node) = done.take() {
                frame.attach(node);
            }
            if let Some(child) = frame.next_child() {
                pending = Some(child);
                break;
            }
            done = stack.pop().map(|frame| frame.finish(sequence, mapping));
        }
    }
}

/// Depth-first iterator over a parameter tree's values.
#[derive(Debug)]
pub struct ParamLeaves<'a> {
    stack: Vec<&'a ParamNode>,
}

impl<'a> Iterator for ParamLeaves<'a> {
    type Item = ScanLeaf<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                ParamNode::Scalar(value) => return Some(ScanLeaf::InlineBytes(value)),
                ParamNode::Sequence(children) => self.stack.extend(children.iter().rev()),
                ParamNode::Mapping(children) => self.stack.extend(children.values().rev()),
            }
        }
        None
    }
}
