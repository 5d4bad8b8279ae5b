use crate::{jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnLists,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageOwnProfile,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnLists,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageOwnProfile,
            ActionType::ManageAllRecipes,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    /// Favorites and the shopping cart.
    ManageOwnLists,
    ManageOwnRecipes,
    ManageOwnSubscriptions,
    ManageOwnProfile,

    ManageAllRecipes,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        let user_role = &session.user_role;

        ACTION_TABLE
            .iter()
            .find_map(|(role, actions)| {
                if user_role != role {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::JwtSessionData;

    fn session(role: UserRole) -> SessionData {
        JwtSessionData::new(1, String::from("cook"), role).into()
    }

    #[test]
    fn users_manage_only_their_own_rows() {
        let user = session(UserRole::User);

        assert!(ActionType::ManageOwnLists.authenticate(&user));
        assert!(ActionType::CreateRecipes.authenticate(&user));
        assert!(!ActionType::ManageAllRecipes.authenticate(&user));
    }

    #[test]
    fn admins_manage_all_recipes() {
        let admin = session(UserRole::Admin);

        assert!(ActionType::ManageAllRecipes.authenticate(&admin));
        assert!(admin.authenticate(ActionType::ManageOwnSubscriptions).is_ok());
    }
}
