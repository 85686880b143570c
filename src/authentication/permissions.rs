use crate::{jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnMemberships,
            ActionType::ManageOwnSubscriptions,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnMemberships,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageAllRecipes,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnMemberships,
    ManageOwnSubscriptions,

    ManageAllRecipes,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        ACTION_TABLE
            .iter()
            .find(|(role, _)| *role == session.role)
            .is_some_and(|(_, actions)| actions.contains(&self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: UserRole) -> SessionData {
        SessionData {
            user_id: 1,
            username: "cook".to_owned(),
            role,
        }
    }

    #[test]
    fn only_admins_manage_all_recipes() {
        assert!(!ActionType::ManageAllRecipes.authenticate(&session(UserRole::User)));
        assert!(ActionType::ManageAllRecipes.authenticate(&session(UserRole::Admin)));
    }

    #[test]
    fn owners_manage_their_own_recipes() {
        let user = session(UserRole::User);

        assert!(user.can_manage(1, ActionType::ManageOwnRecipes, ActionType::ManageAllRecipes));
        assert!(!user.can_manage(2, ActionType::ManageOwnRecipes, ActionType::ManageAllRecipes));
        assert!(session(UserRole::Admin).can_manage(
            2,
            ActionType::ManageOwnRecipes,
            ActionType::ManageAllRecipes
        ));
    }
}
