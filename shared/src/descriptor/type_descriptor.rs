use std::sync::Arc;

use crate::{PeerInfo, TypeTag, Visibility};

use super::{method_descriptor::MethodDescriptor, property_descriptor::PropertyDescriptor};

/// Declares a user type: its wire tag, who may see it, its properties and
/// its remote methods
#[derive(Clone, Debug)]
pub struct TypeDescriptor {
    type_tag: TypeTag,
    visibility: Visibility,
    properties: Vec<PropertyDescriptor>,
    methods: Vec<MethodDescriptor>,
}

impl TypeDescriptor {
    pub fn builder(type_tag: impl Into<TypeTag>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder {
            descriptor: TypeDescriptor {
                type_tag: type_tag.into(),
                visibility: Visibility::All,
                properties: Vec::new(),
                methods: Vec::new(),
            },
        }
    }

    pub fn type_tag(&self) -> &TypeTag {
        &self.type_tag
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    pub fn is_visible_to(&self, peer: &PeerInfo) -> bool {
        self.visibility.allows(peer)
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|property| property.name() == name)
    }

    /// Properties the peer may see, in declaration order
    pub fn visible_properties<'a>(
        &'a self,
        peer: &'a PeerInfo,
    ) -> impl Iterator<Item = &'a PropertyDescriptor> + 'a {
        self.properties
            .iter()
            .filter(move |property| property.visibility().allows(peer))
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|method| method.name() == name)
    }
}

pub struct TypeDescriptorBuilder {
    descriptor: TypeDescriptor,
}

impl TypeDescriptorBuilder {
    pub fn visible_to(mut self, visibility: Visibility) -> Self {
        self.descriptor.visibility = visibility;
        self
    }

    /// Declares a property. Redeclaring a name replaces the earlier one.
    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.descriptor
            .properties
            .retain(|existing| existing.name() != property.name());
        self.descriptor.properties.push(property);
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.descriptor
            .methods
            .retain(|existing| existing.name() != method.name());
        self.descriptor.methods.push(method);
        self
    }

    pub fn build(self) -> Arc<TypeDescriptor> {
        Arc::new(self.descriptor)
    }
}
