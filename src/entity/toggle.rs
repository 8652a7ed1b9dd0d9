use crate::entity::Entity;
use crate::spec::PropertySpec;
use crate::value::Value;
use async_trait::async_trait;

/// Entities that switch on and off through their service's `on` property.
#[async_trait]
pub trait ToggleEntity: Entity {
    fn power_property(&self) -> Option<&PropertySpec>;

    fn is_on(&self) -> Option<bool> {
        let property = self.power_property()?;
        self.base().decoded(property)?.as_bool()
    }

    async fn turn_on(&self) -> bool {
        match self.power_property() {
            Some(property) => self.base().set_property(property, Value::Bool(true)).await,
            None => false,
        }
    }

    async fn turn_off(&self) -> bool {
        match self.power_property() {
            Some(property) => self.base().set_property(property, Value::Bool(false)).await,
            None => false,
        }
    }

    async fn toggle(&self) -> bool {
        if self.is_on() == Some(true) {
            self.turn_off().await
        } else {
            self.turn_on().await
        }
    }
}
