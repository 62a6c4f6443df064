// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run, lumi and event records handed to modules
//!
//! Products are type-erased and keyed by the label of the module that put
//! them plus an instance name. The event's product table uses interior
//! mutability so an on-demand producer can add products while another
//! module holds the event.

use crate::id::{EventId, LumiNumber, ModuleLabel, RunNumber};
use std::any::Any;
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

/// A type-erased data product.
pub type Product = Arc<dyn Any + Send + Sync>;

/// Key of a product within one principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductKey {
    pub label: ModuleLabel,
    pub instance: String,
}

impl ProductKey {
    pub fn new(label: impl Into<ModuleLabel>, instance: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            instance: instance.into(),
        }
    }
}

#[derive(Default)]
struct ProductTable {
    products: RefCell<HashMap<ProductKey, Product>>,
}

impl ProductTable {
    /// Insert unless the key is taken; the first product stays.
    fn put(&self, key: ProductKey, product: Product) -> bool {
        match self.products.borrow_mut().entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(product);
                true
            }
        }
    }

    /// Fold in products from a later fragment, which win on conflict.
    fn absorb(&self, other: ProductTable) {
        let products = other.products.into_inner();
        self.products.borrow_mut().extend(products);
    }

    fn get(&self, key: &ProductKey) -> Option<Product> {
        self.products.borrow().get(key).cloned()
    }

    fn len(&self) -> usize {
        self.products.borrow().len()
    }
}

impl std::fmt::Debug for ProductTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let products = self.products.borrow();
        let mut keys: Vec<_> = products.keys().collect();
        keys.sort_by(|a, b| (&a.label, &a.instance).cmp(&(&b.label, &b.instance)));
        f.debug_list().entries(keys).finish()
    }
}

/// Opaque conditions handle passed through to modules unmodified.
#[derive(Clone, Default)]
pub struct Conditions(Option<Arc<dyn Any + Send + Sync>>);

impl Conditions {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|v| v.downcast_ref::<T>())
    }
}

impl std::fmt::Debug for Conditions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Conditions")
            .field(&self.0.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Description of an input (or output) file boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileBlock {
    pub name: String,
}

impl FileBlock {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A run record.
#[derive(Debug)]
pub struct RunPrincipal {
    pub run: RunNumber,
    /// Number of input files that contributed to this run.
    pub fragments: u32,
    products: ProductTable,
}

impl RunPrincipal {
    pub fn new(run: impl Into<RunNumber>) -> Self {
        Self {
            run: run.into(),
            fragments: 1,
            products: ProductTable::default(),
        }
    }

    /// Fold a continuation of the same run read from another file.
    pub fn merge(&mut self, other: RunPrincipal) {
        self.fragments += other.fragments;
        self.products.absorb(other.products);
    }

    pub fn put(&self, key: ProductKey, product: Product) -> bool {
        self.products.put(key, product)
    }

    pub fn get(&self, key: &ProductKey) -> Option<Product> {
        self.products.get(key)
    }
}

/// A luminosity block record.
#[derive(Debug)]
pub struct LumiPrincipal {
    pub run: RunNumber,
    pub lumi: LumiNumber,
    pub fragments: u32,
    products: ProductTable,
}

impl LumiPrincipal {
    pub fn new(run: impl Into<RunNumber>, lumi: impl Into<LumiNumber>) -> Self {
        Self {
            run: run.into(),
            lumi: lumi.into(),
            fragments: 1,
            products: ProductTable::default(),
        }
    }

    pub fn merge(&mut self, other: LumiPrincipal) {
        self.fragments += other.fragments;
        self.products.absorb(other.products);
    }

    pub fn put(&self, key: ProductKey, product: Product) -> bool {
        self.products.put(key, product)
    }

    pub fn get(&self, key: &ProductKey) -> Option<Product> {
        self.products.get(key)
    }
}

/// An event record and the products put into it so far.
#[derive(Debug)]
pub struct EventPrincipal {
    pub id: EventId,
    products: ProductTable,
}

impl EventPrincipal {
    pub fn new(id: EventId) -> Self {
        Self {
            id,
            products: ProductTable::default(),
        }
    }

    /// Insert a product. Returns false, keeping the earlier product, if the
    /// key was already present.
    pub fn put(&self, key: ProductKey, product: Product) -> bool {
        self.products.put(key, product)
    }

    pub fn get(&self, key: &ProductKey) -> Option<Product> {
        self.products.get(key)
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}

#[cfg(test)]
#[path = "principal_tests.rs"]
mod tests;
