//! Product table with create, edit and delete affordances.
//!
//! The cache is written only through [`ListWidget::set_data`]; user actions are
//! published as [`MutationIntent`]s and never touch the cache themselves.

use shared::domain::{Product, ProductDraft, ProductId};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::events::{EventBus, MutationIntent};

/// Price inputs accept cents at most.
const PRICE_STEP: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{0} is required")]
    MissingField(ProductField),
    #[error("price must be a number, got '{0}'")]
    InvalidPrice(String),
    #[error("price must be a multiple of 0.01, got '{0}'")]
    PriceStepMismatch(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("no rendered row for product {0}")]
    UnknownRow(ProductId),
    #[error("edit panel is not open")]
    EditPanelClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductField {
    Name,
    Description,
    Price,
}

impl std::fmt::Display for ProductField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ProductField::Name => "name",
            ProductField::Description => "description",
            ProductField::Price => "price",
        })
    }
}

/// Raw input values, validated the way a browser validates `required` and `type=number` inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: String,
}

impl ProductForm {
    fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
        }
    }

    fn set(&mut self, field: ProductField, value: &str) {
        let slot = match field {
            ProductField::Name => &mut self.name,
            ProductField::Description => &mut self.description,
            ProductField::Price => &mut self.price,
        };
        *slot = value.to_string();
    }

    pub fn validate(&self) -> Result<(String, String, f64), FormError> {
        if self.name.is_empty() {
            return Err(FormError::MissingField(ProductField::Name));
        }
        if self.description.is_empty() {
            return Err(FormError::MissingField(ProductField::Description));
        }
        let raw_price = self.price.trim();
        if raw_price.is_empty() {
            return Err(FormError::MissingField(ProductField::Price));
        }
        let price = raw_price
            .parse::<f64>()
            .ok()
            .filter(|price| price.is_finite())
            .ok_or_else(|| FormError::InvalidPrice(raw_price.to_string()))?;
        let steps = price / PRICE_STEP;
        if (steps - steps.round()).abs() > 1e-6 {
            return Err(FormError::PriceStepMismatch(raw_price.to_string()));
        }
        Ok((self.name.clone(), self.description.clone(), price))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Display form of the price, e.g. `$9.99`.
    pub price: String,
}

impl ProductRow {
    fn render(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: format!("${}", product.price),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditPanel {
    pub id: ProductId,
    pub form: ProductForm,
    /// Not editable here; carried so the full product goes back unchanged.
    stock: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListState {
    pub items: Vec<Product>,
    pub rows: Vec<ProductRow>,
    /// Number of full row rebuilds so far.
    pub renders: u64,
    pub create_form: ProductForm,
    pub create_error: Option<String>,
    pub edit_panel: Option<EditPanel>,
    pub edit_error: Option<String>,
}

impl ListState {
    fn row_item(&self, id: &ProductId) -> Option<&Product> {
        // Affordances only exist for rendered rows.
        self.rows
            .iter()
            .position(|row| &row.id == id)
            .and_then(|index| self.items.get(index))
    }
}

pub struct ListWidget {
    state: watch::Sender<ListState>,
    events: EventBus<MutationIntent>,
}

impl ListWidget {
    pub fn new(event_capacity: usize) -> Self {
        let (state, _) = watch::channel(ListState::default());
        Self {
            state,
            events: EventBus::new(event_capacity),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MutationIntent> {
        self.events.subscribe()
    }

    pub fn watch(&self) -> watch::Receiver<ListState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ListState {
        self.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<Product> {
        self.state.borrow().items.clone()
    }

    pub fn rows(&self) -> Vec<ProductRow> {
        self.state.borrow().rows.clone()
    }

    pub fn render_count(&self) -> u64 {
        self.state.borrow().renders
    }

    pub fn edit_panel(&self) -> Option<EditPanel> {
        self.state.borrow().edit_panel.clone()
    }

    /// Replaces the cache wholesale and rebuilds every row.
    pub fn set_data(&self, items: Vec<Product>) {
        debug!(items = items.len(), "rendering product table");
        self.state.send_modify(|state| {
            state.rows = items.iter().map(ProductRow::render).collect();
            state.items = items;
            state.renders += 1;
        });
    }

    pub fn set_create_field(&self, field: ProductField, value: &str) {
        self.state
            .send_modify(|state| state.create_form.set(field, value));
    }

    /// Emits `item-create` for a valid form. The form is left as is until the next render.
    pub fn submit_create(&self) -> Result<ProductDraft, ListError> {
        let validated = self.state.borrow().create_form.validate();
        let result = validated.map(|(name, description, price)| {
            ProductDraft::new(name, description, price)
        });
        self.state.send_modify(|state| {
            state.create_error = result.as_ref().err().map(ToString::to_string);
        });

        let draft = result?;
        self.events.publish(MutationIntent::Create {
            item: draft.clone(),
        });
        Ok(draft)
    }

    /// Opens the edit panel with the row's current cached values, replacing any open edit.
    pub fn click_edit(&self, id: &ProductId) -> Result<(), ListError> {
        let mut result = Err(ListError::UnknownRow(id.clone()));
        self.state.send_modify(|state| {
            let Some(item) = state.row_item(id) else {
                return;
            };
            let panel = EditPanel {
                id: item.id.clone(),
                form: ProductForm::from_product(item),
                stock: item.stock,
            };
            state.edit_panel = Some(panel);
            state.edit_error = None;
            result = Ok(());
        });
        result
    }

    pub fn set_edit_field(&self, field: ProductField, value: &str) -> Result<(), ListError> {
        self.state.send_if_modified(|state| match state.edit_panel.as_mut() {
            Some(panel) => {
                panel.form.set(field, value);
                true
            }
            None => false,
        });
        if self.state.borrow().edit_panel.is_some() {
            Ok(())
        } else {
            Err(ListError::EditPanelClosed)
        }
    }

    pub fn cancel_edit(&self) {
        self.state.send_if_modified(|state| {
            state.edit_error = None;
            state.edit_panel.take().is_some()
        });
    }

    /// Emits `item-edit` and closes the panel without waiting for the server.
    pub fn submit_edit(&self) -> Result<Product, ListError> {
        let mut result = Err(ListError::EditPanelClosed);
        self.state.send_modify(|state| {
            let Some(panel) = state.edit_panel.as_ref() else {
                return;
            };
            match panel.form.validate() {
                Ok((name, description, price)) => {
                    result = Ok(Product {
                        id: panel.id.clone(),
                        name,
                        description,
                        price,
                        stock: panel.stock,
                    });
                    state.edit_panel = None;
                    state.edit_error = None;
                }
                Err(err) => {
                    state.edit_error = Some(err.to_string());
                    result = Err(err.into());
                }
            }
        });

        let product = result?;
        self.events.publish(MutationIntent::Edit {
            item: product.clone(),
        });
        Ok(product)
    }

    /// Emits `item-delete` immediately; there is no confirmation step.
    pub fn click_delete(&self, id: &ProductId) -> Result<(), ListError> {
        let target = self.state.borrow().row_item(id).map(|item| item.id.clone());
        let id = target.ok_or_else(|| ListError::UnknownRow(id.clone()))?;
        self.events.publish(MutationIntent::Delete { id });
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/list_widget_tests.rs"]
mod tests;
