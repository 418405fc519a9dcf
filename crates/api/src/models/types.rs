//! Structural type model shared between an inference engine and its plugins.
//!
//! Types live in an arena ([`TypeStore`]) and are addressed by [`TypeId`].
//! Program locations that can hold types (variables, parameters, object
//! members, expressions) are abstract values ([`AVal`]) addressed by
//! [`ValueId`]. An abstract value holds an ordered, deduplicated set of
//! types. Inference only adds to it; plugins that attach types from other
//! files may take back what they attached.
//!
//! Ids are indexes into the arena, which only grows. Re-inferring a file
//! allocates fresh types and values, so a session is bounded by `u32::MAX`
//! of each.

use crate::error::{ApiError, ApiResult};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Number,
    String,
    Bool,
}

impl Primitive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::Number => "number",
            Primitive::String => "string",
            Primitive::Bool => "bool",
        }
    }
}

/// An object type: an ordered bag of named members.
#[derive(Debug, Clone, Default)]
pub struct ObjType {
    /// Constructor or display name, if known.
    pub name: Option<String>,
    pub props: IndexMap<String, ValueId>,
    pub doc: Option<String>,
    /// File the type was created for.
    pub origin: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FnType {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub ret: ValueId,
    pub doc: Option<String>,
    pub origin: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Type {
    Obj(ObjType),
    Fn(FnType),
    Prim(Primitive),
}

/// An abstract value.
#[derive(Debug, Clone, Default)]
pub struct AVal {
    types: IndexSet<TypeId>,
    /// Properties read or written through this value directly.
    props: IndexMap<String, ValueId>,
    /// When set, property enumeration on this value reports exactly these
    /// names, whatever its types contain.
    enumeration: Option<Vec<String>>,
}

impl AVal {
    pub fn types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.types.iter().copied()
    }

    pub fn first_type(&self) -> Option<TypeId> {
        self.types.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn enumeration(&self) -> Option<&[String]> {
        self.enumeration.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct TypeStore {
    types: Vec<Type>,
    values: Vec<AVal>,
    number: TypeId,
    string: TypeId,
    boolean: TypeId,
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeStore {
    pub fn new() -> Self {
        Self {
            types: vec![
                Type::Prim(Primitive::Number),
                Type::Prim(Primitive::String),
                Type::Prim(Primitive::Bool),
            ],
            values: Vec::new(),
            number: TypeId(0),
            string: TypeId(1),
            boolean: TypeId(2),
        }
    }

    pub fn prim(&self, prim: Primitive) -> TypeId {
        match prim {
            Primitive::Number => self.number,
            Primitive::String => self.string,
            Primitive::Bool => self.boolean,
        }
    }

    fn push_type(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    pub fn new_value(&mut self) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(AVal::default());
        id
    }

    pub fn new_obj(&mut self, name: Option<&str>, origin: Option<&str>) -> TypeId {
        self.push_type(Type::Obj(ObjType {
            name: name.map(str::to_string),
            origin: origin.map(str::to_string),
            ..ObjType::default()
        }))
    }

    pub fn new_fn(&mut self, name: Option<&str>, params: Vec<String>, origin: Option<&str>) -> TypeId {
        let ret = self.new_value();
        self.push_type(Type::Fn(FnType {
            name: name.map(str::to_string),
            params,
            ret,
            doc: None,
            origin: origin.map(str::to_string),
        }))
    }

    pub fn get(&self, ty: TypeId) -> Option<&Type> {
        self.types.get(ty.0 as usize)
    }

    pub fn obj(&self, ty: TypeId) -> Option<&ObjType> {
        match self.get(ty) {
            Some(Type::Obj(obj)) => Some(obj),
            _ => None,
        }
    }

    pub fn value(&self, value: ValueId) -> Option<&AVal> {
        self.values.get(value.0 as usize)
    }

    fn value_mut(&mut self, value: ValueId) -> ApiResult<&mut AVal> {
        self.values
            .get_mut(value.0 as usize)
            .ok_or(ApiError::UnknownValue(value.0))
    }

    /// Add a type to a value. Returns `true` if the type was not yet present.
    pub fn add_type(&mut self, value: ValueId, ty: TypeId) -> ApiResult<bool> {
        if self.get(ty).is_none() {
            return Err(ApiError::UnknownType(ty.0));
        }
        Ok(self.value_mut(value)?.types.insert(ty))
    }

    /// Take a type back out of a value. Returns `true` if it was present.
    /// The order of the remaining types is kept.
    pub fn remove_type(&mut self, value: ValueId, ty: TypeId) -> ApiResult<bool> {
        Ok(self.value_mut(value)?.types.shift_remove(&ty))
    }

    /// Copy every type of `from` into `to`.
    pub fn propagate(&mut self, from: ValueId, to: ValueId) -> ApiResult<()> {
        let types: Vec<TypeId> = match self.value(from) {
            Some(aval) => aval.types().collect(),
            None => return Err(ApiError::UnknownValue(from.0)),
        };
        for ty in types {
            self.add_type(to, ty)?;
        }
        Ok(())
    }

    pub fn first_type(&self, value: ValueId) -> Option<TypeId> {
        self.value(value).and_then(AVal::first_type)
    }

    /// Existing member of an object type.
    pub fn obj_prop(&self, obj: TypeId, name: &str) -> Option<ValueId> {
        self.obj(obj).and_then(|o| o.props.get(name).copied())
    }

    /// Member of an object type, created empty on first access.
    pub fn ensure_obj_prop(&mut self, obj: TypeId, name: &str) -> ApiResult<ValueId> {
        if let Some(existing) = self.obj_prop(obj, name) {
            return Ok(existing);
        }
        if self.obj(obj).is_none() {
            return Err(ApiError::NotAnObject(obj.0));
        }
        let value = self.new_value();
        match self.types.get_mut(obj.0 as usize) {
            Some(Type::Obj(o)) => {
                o.props.insert(name.to_string(), value);
                Ok(value)
            }
            _ => Err(ApiError::NotAnObject(obj.0)),
        }
    }

    /// Property accessed through a value, created empty on first access.
    pub fn value_prop(&mut self, value: ValueId, name: &str) -> ApiResult<ValueId> {
        if let Some(existing) = self.value(value).and_then(|v| v.props.get(name).copied()) {
            return Ok(existing);
        }
        self.value_mut(value)?;
        let prop = self.new_value();
        self.value_mut(value)?.props.insert(name.to_string(), prop);
        Ok(prop)
    }

    /// Resolve a member read `value.name`: the value's own property if one
    /// was recorded, plus the member of every object type the value holds.
    pub fn lookup_member(&self, value: ValueId, name: &str) -> Vec<TypeId> {
        let Some(aval) = self.value(value) else {
            return Vec::new();
        };
        let mut found = IndexSet::new();
        if let Some(own) = aval.props.get(name).and_then(|p| self.value(*p)) {
            found.extend(own.types());
        }
        for ty in aval.types() {
            if let Some(member) = self.obj_prop(ty, name).and_then(|p| self.value(p)) {
                found.extend(member.types());
            }
        }
        found.into_iter().collect()
    }

    pub fn set_enumeration(&mut self, value: ValueId, names: Vec<String>) -> ApiResult<()> {
        self.value_mut(value)?.enumeration = Some(names);
        Ok(())
    }

    /// Names offered when completing `value.`.
    ///
    /// An enumeration override wins outright. Otherwise the value's own
    /// properties come first, followed by the members of each object type it
    /// holds, without duplicates.
    pub fn gather_properties(&self, value: ValueId) -> Vec<String> {
        let Some(aval) = self.value(value) else {
            return Vec::new();
        };
        if let Some(names) = &aval.enumeration {
            return names.clone();
        }
        let mut names: IndexSet<String> = aval.props.keys().cloned().collect();
        for ty in aval.types() {
            if let Some(obj) = self.obj(ty) {
                names.extend(obj.props.keys().cloned());
            }
        }
        names.into_iter().collect()
    }

    pub fn set_doc(&mut self, ty: TypeId, doc: String) {
        match self.types.get_mut(ty.0 as usize) {
            Some(Type::Obj(obj)) => obj.doc = Some(doc),
            Some(Type::Fn(func)) => func.doc = Some(doc),
            _ => {}
        }
    }

    pub fn doc(&self, ty: TypeId) -> Option<&str> {
        match self.get(ty)? {
            Type::Obj(obj) => obj.doc.as_deref(),
            Type::Fn(func) => func.doc.as_deref(),
            Type::Prim(_) => None,
        }
    }

    /// First type of an object member.
    pub fn member_type(&self, obj: TypeId, name: &str) -> Option<TypeId> {
        self.obj_prop(obj, name).and_then(|p| self.first_type(p))
    }

    /// Short human-readable rendering of a type.
    pub fn describe(&self, ty: TypeId) -> String {
        match self.get(ty) {
            Some(Type::Prim(prim)) => prim.as_str().to_string(),
            Some(Type::Fn(func)) => format!("fn({})", func.params.join(", ")),
            Some(Type::Obj(obj)) => match &obj.name {
                Some(name) => name.clone(),
                None => {
                    let keys: Vec<&str> = obj.props.keys().map(String::as_str).collect();
                    format!("{{{}}}", keys.join(", "))
                }
            },
            None => "?".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_type_dedupes() {
        let mut store = TypeStore::new();
        let v = store.new_value();
        let num = store.prim(Primitive::Number);
        assert!(store.add_type(v, num).unwrap());
        assert!(!store.add_type(v, num).unwrap());
        assert_eq!(store.value(v).unwrap().types().count(), 1);
    }

    #[test]
    fn test_remove_type_keeps_order_of_the_rest() {
        let mut store = TypeStore::new();
        let v = store.new_value();
        let num = store.prim(Primitive::Number);
        let string = store.prim(Primitive::String);
        let boolean = store.prim(Primitive::Bool);
        for ty in [num, string, boolean] {
            store.add_type(v, ty).unwrap();
        }

        assert!(store.remove_type(v, num).unwrap());
        assert!(!store.remove_type(v, num).unwrap());
        assert_eq!(store.first_type(v), Some(string));
        assert_eq!(store.value(v).unwrap().types().collect::<Vec<_>>(), vec![string, boolean]);
    }

    #[test]
    fn test_gather_properties_merges_own_and_object_members() {
        let mut store = TypeStore::new();
        let obj = store.new_obj(None, None);
        store.ensure_obj_prop(obj, "a").unwrap();
        store.ensure_obj_prop(obj, "b").unwrap();

        let v = store.new_value();
        store.value_prop(v, "z").unwrap();
        store.add_type(v, obj).unwrap();

        assert_eq!(store.gather_properties(v), vec!["z", "a", "b"]);
    }

    #[test]
    fn test_enumeration_override_wins() {
        let mut store = TypeStore::new();
        let obj = store.new_obj(None, None);
        store.ensure_obj_prop(obj, "hidden").unwrap();
        let v = store.new_value();
        store.add_type(v, obj).unwrap();

        store.set_enumeration(v, vec!["fs".to_string()]).unwrap();
        assert_eq!(store.gather_properties(v), vec!["fs"]);
    }

    #[test]
    fn test_ensure_obj_prop_rejects_non_objects() {
        let mut store = TypeStore::new();
        let num = store.prim(Primitive::Number);
        assert!(matches!(
            store.ensure_obj_prop(num, "x"),
            Err(ApiError::NotAnObject(_))
        ));
    }

    #[test]
    fn test_lookup_member_through_value() {
        let mut store = TypeStore::new();
        let obj = store.new_obj(None, None);
        let member = store.ensure_obj_prop(obj, "size").unwrap();
        let num = store.prim(Primitive::Number);
        store.add_type(member, num).unwrap();

        let v = store.new_value();
        store.add_type(v, obj).unwrap();
        assert_eq!(store.lookup_member(v, "size"), vec![num]);
        assert!(store.lookup_member(v, "missing").is_empty());
    }
}
