use potion::{Error, HtmlError};

/// Join rows that a user toggles on and off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Association {
    Favorite,
    ShoppingCart,
    Subscription,
}

impl Association {
    pub fn table(&self) -> &'static str {
        match self {
            Association::Favorite => "favorites",
            Association::ShoppingCart => "shopping_cart",
            Association::Subscription => "subscriptions",
        }
    }

    /// Column holding the other side of the pair; the first side is always `user_id`.
    pub fn target_column(&self) -> &'static str {
        match self {
            Association::Favorite | Association::ShoppingCart => "recipe_id",
            Association::Subscription => "subscribed_to_id",
        }
    }

    fn already_exists_message(&self) -> &'static str {
        match self {
            Association::Favorite => "Recipe is already in favorites",
            Association::ShoppingCart => "Recipe is already in the shopping cart",
            Association::Subscription => "You are already subscribed to this user",
        }
    }

    fn missing_message(&self) -> &'static str {
        match self {
            Association::Favorite => "Recipe is not in favorites",
            Association::ShoppingCart => "Recipe is not in the shopping cart",
            Association::Subscription => "You are not subscribed to this user",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Created,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("{}", .0.already_exists_message())]
    AlreadyExists(Association),
    #[error("{}", .0.missing_message())]
    Missing(Association),
    #[error("You cannot subscribe to yourself")]
    SelfSubscription,
}

impl From<GuardError> for Error {
    fn from(value: GuardError) -> Self {
        HtmlError::InvalidRequest.new(&value.to_string())
    }
}

/// Decides whether `toggle` may be applied given the current membership.
pub fn guard(
    kind: Association,
    toggle: Toggle,
    present: bool,
) -> Result<ToggleOutcome, GuardError> {
    match (toggle, present) {
        (Toggle::Add, false) => Ok(ToggleOutcome::Created),
        (Toggle::Add, true) => Err(GuardError::AlreadyExists(kind)),
        (Toggle::Remove, true) => Ok(ToggleOutcome::Deleted),
        (Toggle::Remove, false) => Err(GuardError::Missing(kind)),
    }
}

pub fn guard_subscription(
    user_id: i32,
    author_id: i32,
    toggle: Toggle,
    present: bool,
) -> Result<ToggleOutcome, GuardError> {
    if toggle == Toggle::Add && user_id == author_id {
        return Err(GuardError::SelfSubscription);
    }
    guard(Association::Subscription, toggle, present)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_add_is_rejected() {
        for kind in [Association::Favorite, Association::ShoppingCart] {
            assert_eq!(guard(kind, Toggle::Add, false), Ok(ToggleOutcome::Created));
            assert_eq!(
                guard(kind, Toggle::Add, true),
                Err(GuardError::AlreadyExists(kind))
            );
        }
    }

    #[test]
    fn remove_without_add_is_rejected() {
        for kind in [Association::Favorite, Association::ShoppingCart] {
            assert_eq!(guard(kind, Toggle::Remove, false), Err(GuardError::Missing(kind)));
            assert_eq!(guard(kind, Toggle::Remove, true), Ok(ToggleOutcome::Deleted));
        }
    }

    #[test]
    fn cannot_subscribe_to_self() {
        assert_eq!(
            guard_subscription(4, 4, Toggle::Add, false),
            Err(GuardError::SelfSubscription)
        );
        assert_eq!(
            guard_subscription(4, 5, Toggle::Add, false),
            Ok(ToggleOutcome::Created)
        );
        // Removing is still checked against membership only.
        assert_eq!(
            guard_subscription(4, 4, Toggle::Remove, false),
            Err(GuardError::Missing(Association::Subscription))
        );
    }

    #[test]
    fn messages_name_the_list() {
        assert_eq!(
            GuardError::AlreadyExists(Association::ShoppingCart).to_string(),
            "Recipe is already in the shopping cart"
        );
        assert_eq!(
            GuardError::Missing(Association::Favorite).to_string(),
            "Recipe is not in favorites"
        );
        assert_eq!(
            GuardError::AlreadyExists(Association::Subscription).to_string(),
            "You are already subscribed to this user"
        );
        assert_eq!(
            GuardError::SelfSubscription.to_string(),
            "You cannot subscribe to yourself"
        );
    }
}
