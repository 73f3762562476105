//! Role-claim planning.
//!
//! Claiming is decided against snapshots of guild state and expressed as a
//! plan, so the interesting conditionals (create vs update, hierarchy
//! denial, assignment) stay pure and the platform layer only executes.

/// Claimed roles follow a fixed naming convention; there is no stored
/// user-to-role mapping.
pub fn claim_role_name(user_id: &str) -> String {
    format!("USER-{user_id}")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleSnapshot {
    pub id: String,
    pub name: String,
    pub color: u32,
    pub position: i64,
    pub managed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimInput {
    pub user_id: String,
    pub color: u32,
    /// Every role in the guild, `@everyone` included.
    pub guild_roles: Vec<RoleSnapshot>,
    /// Role ids held by the bot's own member.
    pub bot_role_ids: Vec<String>,
    /// Role ids held by the invoking member.
    pub member_role_ids: Vec<String>,
}

/// What a created or updated claim role must look like.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleSpec {
    pub name: String,
    pub color: u32,
    pub position: i64,
    pub hoist: bool,
    pub mentionable: bool,
    pub permissions: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimPlan {
    /// No conventional role yet; create it and assign the member.
    Create { role: RoleSpec },
    /// Role exists below the bot; recolor in place, assign only when the
    /// member does not already hold it.
    Update { role_id: String, role: RoleSpec, assign: bool },
    /// Role exists but sits strictly above the bot's highest role.
    Denied { role_name: String, bot_top_name: String },
}

pub fn plan_role_claim(input: &ClaimInput) -> ClaimPlan {
    let role_name = claim_role_name(&input.user_id);
    let bot_roles: Vec<&RoleSnapshot> = input
        .guild_roles
        .iter()
        .filter(|role| input.bot_role_ids.contains(&role.id))
        .collect();

    // Claimed roles slot in at the bot's integration role; without one they
    // land at the bottom of the hierarchy.
    let position =
        bot_roles.iter().find(|role| role.managed).map_or(0, |role| role.position);

    let role = RoleSpec {
        name: role_name.clone(),
        color: input.color,
        position,
        hoist: false,
        mentionable: false,
        permissions: "0".to_owned(),
    };

    let Some(existing) = input.guild_roles.iter().find(|candidate| candidate.name == role_name)
    else {
        return ClaimPlan::Create { role };
    };

    let bot_top = bot_roles.iter().max_by_key(|candidate| candidate.position);
    if existing.position > bot_top.map_or(0, |top| top.position) {
        return ClaimPlan::Denied {
            role_name: existing.name.clone(),
            bot_top_name: bot_top.map_or_else(|| "@everyone".to_owned(), |top| top.name.clone()),
        };
    }

    ClaimPlan::Update {
        role_id: existing.id.clone(),
        role,
        assign: !input.member_role_ids.contains(&existing.id),
    }
}

#[cfg(test)]
mod tests {
    use super::{claim_role_name, plan_role_claim, ClaimInput, ClaimPlan, RoleSnapshot};

    fn role(id: &str, name: &str, position: i64, managed: bool) -> RoleSnapshot {
        RoleSnapshot {
            id: id.to_owned(),
            name: name.to_owned(),
            color: 0,
            position,
            managed,
        }
    }

    fn base_input() -> ClaimInput {
        ClaimInput {
            user_id: "42".to_owned(),
            color: 0x00ff_7700,
            guild_roles: vec![
                role("everyone", "@everyone", 0, false),
                role("bot-managed", "Hexbot", 5, true),
                role("mods", "Mods", 9, false),
            ],
            bot_role_ids: vec!["bot-managed".to_owned()],
            member_role_ids: vec![],
        }
    }

    #[test]
    fn creates_role_with_convention_and_managed_position() {
        let plan = plan_role_claim(&base_input());

        let ClaimPlan::Create { role } = plan else {
            panic!("expected a create plan, got {plan:?}");
        };
        assert_eq!(role.name, "USER-42");
        assert_eq!(role.color, 0x00ff_7700);
        assert_eq!(role.position, 5);
        assert_eq!(role.permissions, "0");
        assert!(!role.hoist);
        assert!(!role.mentionable);
    }

    #[test]
    fn position_falls_back_to_zero_without_managed_role() {
        let mut input = base_input();
        input.guild_roles.retain(|candidate| !candidate.managed);
        input.bot_role_ids.clear();

        let ClaimPlan::Create { role } = plan_role_claim(&input) else {
            panic!("expected a create plan");
        };
        assert_eq!(role.position, 0);
    }

    #[test]
    fn updates_existing_role_without_reassigning_held_role() {
        let mut input = base_input();
        input.guild_roles.push(role("existing", &claim_role_name("42"), 4, false));
        input.member_role_ids.push("existing".to_owned());

        let ClaimPlan::Update { role_id, role, assign } = plan_role_claim(&input) else {
            panic!("expected an update plan");
        };
        assert_eq!(role_id, "existing");
        assert_eq!(role.name, "USER-42");
        assert_eq!(role.position, 5);
        assert!(!assign, "held role should not be reassigned");
    }

    #[test]
    fn assigns_existing_role_the_member_does_not_hold() {
        let mut input = base_input();
        input.guild_roles.push(role("existing", &claim_role_name("42"), 4, false));

        let ClaimPlan::Update { assign, .. } = plan_role_claim(&input) else {
            panic!("expected an update plan");
        };
        assert!(assign);
    }

    #[test]
    fn denies_when_existing_role_sits_above_bot_top() {
        let mut input = base_input();
        input.guild_roles.push(role("existing", &claim_role_name("42"), 8, false));
        input.guild_roles.push(role("bot-extra", "Helper", 6, false));
        input.bot_role_ids.push("bot-extra".to_owned());

        let plan = plan_role_claim(&input);
        assert_eq!(
            plan,
            ClaimPlan::Denied {
                role_name: "USER-42".to_owned(),
                bot_top_name: "Helper".to_owned(),
            }
        );
    }

    #[test]
    fn equal_position_is_updated_not_denied() {
        let mut input = base_input();
        input.guild_roles.push(role("existing", &claim_role_name("42"), 5, false));

        assert!(matches!(plan_role_claim(&input), ClaimPlan::Update { .. }));
    }

    #[test]
    fn denial_against_roleless_bot_names_everyone() {
        let mut input = base_input();
        input.guild_roles.retain(|candidate| !candidate.managed);
        input.bot_role_ids.clear();
        input.guild_roles.push(role("existing", &claim_role_name("42"), 1, false));

        let ClaimPlan::Denied { bot_top_name, .. } = plan_role_claim(&input) else {
            panic!("expected a denial");
        };
        assert_eq!(bot_top_name, "@everyone");
    }
}
