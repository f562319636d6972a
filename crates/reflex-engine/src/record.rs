//! Type records and their builder
//!
//! A [`TypeRecord`] is everything the engine knows about one registered type:
//! its member table, its callable table, its metadata and the parents it
//! falls back to. Records are assembled by a [`TypeBuilder`] and become
//! immutable once published.
//!
//! # Inheritance fallback
//!
//! A lookup that misses locally walks the declared parents depth-first, in
//! declaration order, and the first record that has the name wins. The path
//! taken is remembered so the object can be projected onto the matching
//! ancestor through each link's upcast accessor. When two parents define the
//! same name, the one declared first shadows the other; nothing reports the
//! ambiguity.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use log::{debug, trace, warn};

use crate::args::ArgList;
use crate::callable::{
    CallableTable, CallableWrapper, IntoFunction, IntoMethod, OverloadSet, Receiver, TypedFn,
};
use crate::config::OverloadPolicy;
use crate::convert::ArgTuple;
use crate::error::{ReflectError, ReflectResult};
use crate::member::{erase_get, erase_get_mut, Field, GetFn, GetMutFn, Member, MemberTable};
use crate::metadata::{MetadataStore, MetadataValue};
use crate::object::{ObjectMut, ObjectRef};
use crate::registry::Registry;
use crate::type_desc::{signature_string, TypeDesc};
use crate::value::ReturnValue;

/// Name under which constructors are registered
pub const CTOR: &str = "ctor";

// ============================================================================
// Parent links
// ============================================================================

/// Link from a derived record to one of its parents
#[derive(Clone)]
pub struct ParentLink {
    record: Arc<TypeRecord>,
    upcast: GetFn,
    upcast_mut: GetMutFn,
}

impl ParentLink {
    /// The parent record
    pub fn record(&self) -> &Arc<TypeRecord> {
        &self.record
    }
}

impl fmt::Debug for ParentLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParentLink({})", self.record.name)
    }
}

fn project<'x>(path: &[&ParentLink], mut object: &'x dyn Any) -> Option<&'x dyn Any> {
    for link in path {
        object = (link.upcast)(object)?;
    }
    Some(object)
}

fn project_mut<'x>(path: &[&ParentLink], mut object: &'x mut dyn Any) -> Option<&'x mut dyn Any> {
    for link in path {
        object = (link.upcast_mut)(object)?;
    }
    Some(object)
}

// ============================================================================
// TypeRecord
// ============================================================================

/// Reflection data of one registered type
#[derive(Clone)]
pub struct TypeRecord {
    name: String,
    class_type: TypeDesc,
    members: MemberTable,
    callables: CallableTable,
    parents: Vec<ParentLink>,
    metadata: MetadataStore,
}

impl TypeRecord {
    fn new(name: &str, class_type: TypeDesc) -> Self {
        Self {
            name: name.to_string(),
            class_type,
            members: MemberTable::default(),
            callables: CallableTable::new(),
            parents: Vec::new(),
            metadata: MetadataStore::new(),
        }
    }

    /// Display name given at registration
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptor of the registered type
    pub fn class_type(&self) -> TypeDesc {
        self.class_type
    }

    /// Declared parents, in declaration order
    pub fn parents(&self) -> impl Iterator<Item = &Arc<TypeRecord>> {
        self.parents.iter().map(ParentLink::record)
    }

    /// Local member table (ancestors excluded)
    pub fn member_table(&self) -> &MemberTable {
        &self.members
    }

    /// Local callable table (ancestors excluded)
    pub fn callable_table(&self) -> &CallableTable {
        &self.callables
    }

    /// Metadata attached to this type
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Depth-first search for the first record satisfying `has`, recording the path
    fn locate<'r>(
        &'r self,
        has: &dyn Fn(&TypeRecord) -> bool,
        path: &mut Vec<&'r ParentLink>,
    ) -> Option<&'r TypeRecord> {
        if has(self) {
            return Some(self);
        }
        for link in &self.parents {
            path.push(link);
            if let Some(owner) = link.record.locate(has, path) {
                return Some(owner);
            }
            path.pop();
        }
        None
    }

    fn check_receiver(&self, got: TypeDesc) -> ReflectResult<()> {
        if got == self.class_type {
            Ok(())
        } else {
            Err(ReflectError::type_mismatch(self.class_type, got))
        }
    }

    // ========================================================================
    // Members
    // ========================================================================

    fn resolve_member(&self, name: &str) -> Option<(Vec<&ParentLink>, &Member)> {
        let mut path = Vec::new();
        let owner = self.locate(&|r| r.members.get(name).is_some(), &mut path)?;
        Some((path, owner.members.get(name)?))
    }

    /// Member by name, searching ancestors
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.resolve_member(name).map(|(_, member)| member)
    }

    /// Local members, unordered
    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|m| (m.name(), m))
    }

    /// Every reachable member, shadowed names reported once
    ///
    /// Local members come first, then each parent's in declaration order.
    /// Order within one record is unspecified.
    pub fn all_members(&self) -> Vec<&Member> {
        let mut out: Vec<&Member> = Vec::new();
        self.collect_members(&mut out);
        out
    }

    fn collect_members<'r>(&'r self, out: &mut Vec<&'r Member>) {
        for member in self.members.iter() {
            if !out.iter().any(|m| m.name() == member.name()) {
                out.push(member);
            }
        }
        for link in &self.parents {
            link.record.collect_members(out);
        }
    }

    /// Names of every reachable member
    pub fn member_names(&self) -> Vec<&str> {
        self.all_members().into_iter().map(Member::name).collect()
    }

    /// Typed read access to a member, const or not
    ///
    /// `None` when the member is missing, declared with another type,
    /// or `object` is not of this type.
    pub fn get_member_ref<'a, M: Any>(&self, object: ObjectRef<'a>, name: &str) -> Option<&'a M> {
        let (path, member) = self.resolve_member(name)?;
        Self::read_member(&path, member, object)
    }

    /// Same as [`get_member_ref`](Self::get_member_ref)
    pub fn get_const_member_ref<'a, M: Any>(
        &self,
        object: ObjectRef<'a>,
        name: &str,
    ) -> Option<&'a M> {
        let (path, member) = self.resolve_member(name)?;
        Self::read_member(&path, member, object)
    }

    fn read_member<'a, M: Any>(
        path: &[&ParentLink],
        member: &Member,
        object: ObjectRef<'a>,
    ) -> Option<&'a M> {
        if !member.type_desc().is::<M>() {
            return None;
        }
        let owner = project(path, object.as_any()?)?;
        member.get(owner)?.downcast_ref::<M>()
    }

    /// Typed write access; `None` for const members and every case `get_member_ref` rejects
    pub fn get_member_mut<'a, M: Any>(&self, object: ObjectMut<'a>, name: &str) -> Option<&'a mut M> {
        let (path, member) = self.resolve_member(name)?;
        if !member.type_desc().is::<M>() {
            return None;
        }
        let owner = project_mut(&path, object.into_any())?;
        member.get_mut(owner)?.downcast_mut::<M>()
    }

    /// Erased read access; the none sentinel when the member cannot be reached
    pub fn get_member_wrapped<'a>(&self, object: ObjectRef<'a>, name: &str) -> ObjectRef<'a> {
        self.resolve_member(name)
            .and_then(|(path, member)| {
                let owner = project(&path, object.as_any()?)?;
                let value = member.get(owner)?;
                ObjectRef::from_dyn(value, member.type_desc()).ok()
            })
            .unwrap_or_else(ObjectRef::none)
    }

    /// Erased write access
    pub fn get_member_wrapped_mut<'a>(
        &self,
        object: ObjectMut<'a>,
        name: &str,
    ) -> ReflectResult<ObjectMut<'a>> {
        let (path, member) = self
            .resolve_member(name)
            .ok_or_else(|| ReflectError::member_not_found(self.class_type, name))?;
        if member.is_const() {
            return Err(ReflectError::const_violation(self.class_type, name));
        }
        self.check_receiver(object.type_desc())?;
        let owner = project_mut(&path, object.into_any())
            .ok_or_else(|| ReflectError::member_not_found(self.class_type, name))?;
        let value = member
            .get_mut(owner)
            .ok_or_else(|| ReflectError::member_not_found(self.class_type, name))?;
        ObjectMut::from_dyn(value, member.type_desc())
    }

    /// Assign a clone of `value` to the member
    ///
    /// Fails with `MemberNotFound`, `ConstViolation`, `NotAssignable` (member
    /// registered without an assignment strategy) or `TypeMismatch` (value or
    /// object of the wrong type), checked in that order.
    pub fn set_member(
        &self,
        object: ObjectMut<'_>,
        name: &str,
        value: ObjectRef<'_>,
    ) -> ReflectResult<()> {
        let (path, member) = self
            .resolve_member(name)
            .ok_or_else(|| ReflectError::member_not_found(self.class_type, name))?;
        if member.is_const() {
            return Err(ReflectError::const_violation(self.class_type, name));
        }
        if !member.is_assignable() {
            return Err(ReflectError::NotAssignable {
                type_name: self.name.clone(),
                member: name.to_string(),
            });
        }
        if value.type_desc() != member.type_desc() {
            return Err(ReflectError::type_mismatch(member.type_desc(), value.type_desc()));
        }
        self.check_receiver(object.type_desc())?;

        let source = value
            .as_any()
            .ok_or_else(|| ReflectError::type_mismatch(member.type_desc(), value.type_desc()))?;
        let slot = project_mut(&path, object.into_any())
            .and_then(|owner| member.get_mut(owner))
            .ok_or_else(|| ReflectError::member_not_found(self.class_type, name))?;
        match member.assign(slot, source) {
            Some(true) => Ok(()),
            _ => Err(ReflectError::type_mismatch(member.type_desc(), value.type_desc())),
        }
    }

    /// Check if the member was declared const; false when absent
    pub fn is_member_const(&self, name: &str) -> bool {
        self.member(name).is_some_and(Member::is_const)
    }

    /// Like [`is_member_const`](Self::is_member_const), false when the declared type is not `M`
    pub fn is_member_const_as<M: Any>(&self, name: &str) -> bool {
        self.member(name)
            .is_some_and(|m| m.type_desc().is::<M>() && m.is_const())
    }

    /// Byte offset of the member within the type that declared it
    pub fn member_offset(&self, name: &str) -> Option<usize> {
        self.member(name).map(Member::offset)
    }

    // ========================================================================
    // Callables
    // ========================================================================

    fn resolve_callable(
        &self,
        name: &str,
        args: &[TypeDesc],
        ret: Option<TypeDesc>,
    ) -> ReflectResult<(Vec<&ParentLink>, &CallableWrapper)> {
        let mut path = Vec::new();
        let has = |r: &TypeRecord| {
            r.callables
                .get(name)
                .is_some_and(|set| set.resolve(args, ret).is_some())
        };
        let owner = if name == CTOR {
            // constructors build this exact type, never an ancestor
            has(self).then_some(self)
        } else {
            self.locate(&has, &mut path)
        };
        let wrapper = owner
            .and_then(|owner| owner.callables.get(name)?.resolve(args, ret))
            .ok_or_else(|| ReflectError::method_not_found(&self.name, name))?;
        trace!(
            "{}::{}({}) resolved through {} parent link(s)",
            self.name,
            name,
            signature_string(args),
            path.len()
        );
        Ok((path, wrapper))
    }

    fn project_receiver<'a>(
        &self,
        path: &[&ParentLink],
        object: ObjectMut<'a>,
    ) -> ReflectResult<&'a mut dyn Any> {
        self.check_receiver(object.type_desc())?;
        let ty = object.type_desc();
        project_mut(path, object.into_any())
            .ok_or_else(|| ReflectError::type_mismatch(self.class_type, ty))
    }

    fn project_const_receiver<'a>(
        &self,
        path: &[&ParentLink],
        object: ObjectRef<'a>,
    ) -> ReflectResult<&'a dyn Any> {
        self.check_receiver(object.type_desc())?;
        object
            .as_any()
            .and_then(|o| project(path, o))
            .ok_or_else(|| ReflectError::type_mismatch(self.class_type, object.type_desc()))
    }

    /// Invoke a method through the erased path
    pub fn invoke_method(
        &self,
        object: ObjectMut<'_>,
        name: &str,
        args: &ArgList<'_>,
    ) -> ReflectResult<ReturnValue> {
        let (path, wrapper) = self.resolve_callable(name, &args.type_descs(), None)?;
        let receiver = self.project_receiver(&path, object)?;
        wrapper.invoke(Receiver::Exclusive(receiver), &args.to_object_wrappers())
    }

    /// Invoke a const method on a shared receiver through the erased path
    pub fn invoke_const_method(
        &self,
        object: ObjectRef<'_>,
        name: &str,
        args: &ArgList<'_>,
    ) -> ReflectResult<ReturnValue> {
        let (path, wrapper) = self.resolve_callable(name, &args.type_descs(), None)?;
        if !wrapper.is_const() {
            return Err(ReflectError::const_violation(self.class_type, name));
        }
        let receiver = self.project_const_receiver(&path, object)?;
        wrapper.invoke(Receiver::Shared(receiver), &args.to_object_wrappers())
    }

    /// Invoke a free function or constructor through the erased path
    pub fn invoke_function(&self, name: &str, args: &ArgList<'_>) -> ReflectResult<ReturnValue> {
        let (_, wrapper) = self.resolve_callable(name, &args.type_descs(), None)?;
        wrapper.invoke(Receiver::None, &args.to_object_wrappers())
    }

    fn typed_callable<Args: ArgTuple, R: Any>(
        &self,
        name: &str,
    ) -> ReflectResult<(Vec<&ParentLink>, &CallableWrapper, &TypedFn<Args, R>)> {
        let (path, wrapper) =
            self.resolve_callable(name, &Args::type_descs(), Some(TypeDesc::of::<R>()))?;
        let typed = wrapper
            .typed::<Args, R>()
            .ok_or_else(|| ReflectError::method_not_found(&self.name, name))?;
        Ok((path, wrapper, typed))
    }

    /// Call a method with statically known argument and return types
    pub fn call_method<R: Any, Args: ArgTuple>(
        &self,
        object: ObjectMut<'_>,
        name: &str,
        args: Args,
    ) -> ReflectResult<R> {
        let (path, _, typed) = self.typed_callable::<Args, R>(name)?;
        let receiver = self.project_receiver(&path, object)?;
        typed(Receiver::Exclusive(receiver), args)
    }

    /// Call a const method with statically known argument and return types
    pub fn call_const_method<R: Any, Args: ArgTuple>(
        &self,
        object: ObjectRef<'_>,
        name: &str,
        args: Args,
    ) -> ReflectResult<R> {
        let (path, wrapper, typed) = self.typed_callable::<Args, R>(name)?;
        if !wrapper.is_const() {
            return Err(ReflectError::const_violation(self.class_type, name));
        }
        let receiver = self.project_const_receiver(&path, object)?;
        typed(Receiver::Shared(receiver), args)
    }

    /// Call a free function with statically known argument and return types
    pub fn call_function<R: Any, Args: ArgTuple>(&self, name: &str, args: Args) -> ReflectResult<R> {
        let (_, _, typed) = self.typed_callable::<Args, R>(name)?;
        typed(Receiver::None, args)
    }

    /// Invoke the constructor matching `args` and move the result out
    pub fn construct<T: Any>(&self, args: &ArgList<'_>) -> ReflectResult<T> {
        self.invoke_function(CTOR, args)?.into_inner::<T>()
    }

    /// Overload set for `name`, searching ancestors except for [`CTOR`]
    pub fn overloads(&self, name: &str) -> Option<&OverloadSet> {
        if name == CTOR {
            return self.callables.get(name);
        }
        let mut path = Vec::new();
        self.locate(&|r| r.callables.get(name).is_some(), &mut path)?
            .callables
            .get(name)
    }

    /// Check if any callable is registered under `name`
    pub fn has_method(&self, name: &str) -> bool {
        self.overloads(name).is_some()
    }

    /// True if any overload under `name` was captured from a const method
    pub fn is_method_const(&self, name: &str) -> bool {
        self.overloads(name).is_some_and(OverloadSet::any_const)
    }

    /// Every reachable callable name, shadowed names reported once
    pub fn method_names(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        self.collect_method_names(&mut out);
        out
    }

    fn collect_method_names<'r>(&'r self, out: &mut Vec<&'r str>) {
        for name in self.callables.names() {
            if !out.contains(&name) {
                out.push(name);
            }
        }
        for link in &self.parents {
            link.record.collect_method_names(out);
        }
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Metadata by key
    pub fn get_metadata(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }

    /// Strict typed metadata read
    pub fn get_metadata_as<V: Any>(&self, key: &str) -> ReflectResult<&V> {
        self.metadata
            .get(key)
            .ok_or_else(|| ReflectError::MetadataNotFound {
                type_name: self.name.clone(),
                key: key.to_string(),
            })?
            .downcast::<V>()
    }

    /// Check if a metadata key is present
    pub fn has_metadata(&self, key: &str) -> bool {
        self.metadata.has(key)
    }

    /// Metadata keys, unordered
    pub fn metadata_keys(&self) -> Vec<&str> {
        self.metadata.keys().collect()
    }

    /// Metadata attached to one member, searching ancestors
    pub fn get_member_metadata(&self, member: &str, key: &str) -> Option<&MetadataValue> {
        let mut path = Vec::new();
        self.locate(
            &|r| r.metadata.get_for_member(member, key).is_some(),
            &mut path,
        )?
        .metadata
        .get_for_member(member, key)
    }
}

impl fmt::Debug for TypeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRecord")
            .field("name", &self.name)
            .field("type", &self.class_type)
            .field("members", &self.members.len())
            .field("callables", &self.callables.len())
            .field("parents", &self.parents)
            .finish()
    }
}

// ============================================================================
// TypeBuilder
// ============================================================================

/// Assembles a [`TypeRecord`] for `T`; nothing is visible until [`publish`](Self::publish)
///
/// Registration errors are collected and reported by `publish`, which then
/// leaves the registry untouched.
pub struct TypeBuilder<'r, T> {
    registry: &'r mut Registry,
    record: TypeRecord,
    errors: Vec<ReflectError>,
    _owner: PhantomData<fn() -> T>,
}

impl<'r, T: Any> TypeBuilder<'r, T> {
    pub(crate) fn new(registry: &'r mut Registry, name: &str) -> Self {
        Self {
            registry,
            record: TypeRecord::new(name, TypeDesc::of::<T>()),
            errors: Vec::new(),
            _owner: PhantomData,
        }
    }

    fn add_member(mut self, member: Member) -> Self {
        debug!(
            "{}: member {} ({}, offset {})",
            self.record.name,
            member.name(),
            member.type_desc(),
            member.offset()
        );
        if let Some(previous) = self.record.members.insert(member) {
            warn!(
                "{}: member {} registered twice, keeping the later one",
                self.record.name,
                previous.name()
            );
        }
        self
    }

    /// Register a field whose value can be assigned by cloning
    pub fn member<M: Any + Clone>(self, name: &str, field: Field<T, M>) -> Self {
        self.add_member(Member::from_field(name, field))
    }

    /// Register a field that is readable but has no assignment strategy
    pub fn opaque_member<M: Any>(self, name: &str, field: Field<T, M>) -> Self {
        self.add_member(Member::opaque(name, field))
    }

    fn add_callable(mut self, name: &str, wrapper: CallableWrapper) -> Self {
        let signature = signature_string(wrapper.arg_types());
        match self.record.callables.insert(name, wrapper) {
            Ok(()) => debug!("{}: callable {}({})", self.record.name, name, signature),
            Err(_) => match self.registry.config().overload_policy {
                OverloadPolicy::Reject => self.errors.push(ReflectError::DuplicateOverload {
                    type_name: self.record.name.clone(),
                    method: name.to_string(),
                    signature,
                }),
                OverloadPolicy::FirstWins => warn!(
                    "{}: duplicate overload {}({}) ignored",
                    self.record.name, name, signature
                ),
            },
        }
        self
    }

    /// Register a method: `Fn(&T, ..) -> R` or `Fn(&mut T, ..) -> R`
    pub fn method<Args, R, Kind, F>(self, name: &str, method: F) -> Self
    where
        Args: ArgTuple,
        R: Any,
        F: IntoMethod<T, Args, R, Kind>,
    {
        self.add_callable(name, CallableWrapper::method(method))
    }

    /// Register a free function
    pub fn function<Args, R, F>(self, name: &str, function: F) -> Self
    where
        Args: ArgTuple,
        R: Any,
        F: IntoFunction<Args, R>,
    {
        self.add_callable(name, CallableWrapper::function(function))
    }

    /// Register a constructor overload under [`CTOR`]
    pub fn constructor<Args, F>(self, constructor: F) -> Self
    where
        Args: ArgTuple,
        F: IntoFunction<Args, T>,
    {
        self.add_callable(CTOR, CallableWrapper::function(constructor))
    }

    /// Declare `P` as a parent reachable through the given accessors
    ///
    /// `P` must already be published in the same registry.
    pub fn derives_from<P: Any>(
        mut self,
        upcast: fn(&T) -> &P,
        upcast_mut: fn(&mut T) -> &mut P,
    ) -> Self {
        match self.registry.lookup_type::<P>() {
            Ok(record) => {
                debug!("{}: derives from {}", self.record.name, record.name());
                self.record.parents.push(ParentLink {
                    record,
                    upcast: erase_get(move |object| {
                        object.downcast_ref::<T>().map(|o| upcast(o) as &dyn Any)
                    }),
                    upcast_mut: erase_get_mut(move |object| {
                        object
                            .downcast_mut::<T>()
                            .map(|o| upcast_mut(o) as &mut dyn Any)
                    }),
                });
            }
            Err(err) => self.errors.push(err),
        }
        self
    }

    /// Attach type-level metadata
    pub fn attach_metadata<V: Any + Send + Sync>(mut self, key: &str, value: V) -> Self {
        if self
            .record
            .metadata
            .define(key, MetadataValue::new(value))
            .is_some()
        {
            warn!("{}: metadata {} overwritten", self.record.name, key);
        }
        self
    }

    /// Attach metadata to one member
    pub fn attach_member_metadata<V: Any + Send + Sync>(
        mut self,
        member: &str,
        key: &str,
        value: V,
    ) -> Self {
        self.record
            .metadata
            .define_for_member(member, key, MetadataValue::new(value));
        self
    }

    /// Publish the record, or report the first registration error
    pub fn publish(self) -> ReflectResult<Arc<TypeRecord>> {
        let TypeBuilder {
            registry,
            record,
            mut errors,
            ..
        } = self;
        if !errors.is_empty() {
            return Err(errors.swap_remove(0));
        }
        registry.insert(record)
    }
}
