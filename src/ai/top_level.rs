//! Strategic authority
//!
//! Periodically re-derives the standing set of top-level goals from the
//! world (expansions, production, builder retreat, combat posture, defense)
//! and delegates each one to the group that can carry it out.

use std::cmp::Reverse;

use ahash::{AHashMap, AHashSet};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::ai::context::Ctx;
use crate::ai::group::UnitGroup;
use crate::core::catalog::Role;
use crate::core::config::StrategyConfig;
use crate::core::types::{distance_2d, sq_distance_2d, ActorId, Position, Tick};
use crate::goal::delegate::{delegate, ClaimPolicy};
use crate::goal::processor::{GoalProcessor, Verdict};
use crate::goal::registry::GoalRegistry;
use crate::goal::types::{GoalId, GoalType, Param};
use crate::host::{Allegiance, Host, UnitInfo};
use crate::influence::InfluenceField;

/// Resource sites closer than this are the same site
const DUPLICATE_SITE_RADIUS: f32 = 64.0;

/// Stance of the battle pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Posture {
    /// Regroup at a friendly base
    Gather,
    /// Push into contested territory
    Attack,
}

impl Posture {
    fn flipped(self) -> Self {
        match self {
            Posture::Gather => Posture::Attack,
            Posture::Attack => Posture::Gather,
        }
    }
}

/// Group authorities owned by the strategic tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupKind {
    Builders,
    Bases,
    /// Reserve pool; new combat units land here and defend
    Assign,
    /// Pool currently carrying the combat posture
    Battle,
}

impl GroupKind {
    /// Group that carries out top-level goals of this type
    pub fn for_goal(goal_type: GoalType) -> Self {
        match goal_type {
            GoalType::BuildExpansion | GoalType::Retreat => GroupKind::Builders,
            GoalType::BuildProducer => GroupKind::Bases,
            GoalType::DefendArea => GroupKind::Assign,
            GoalType::AttackArea | GoalType::AttackUnit | GoalType::Move => GroupKind::Battle,
        }
    }

    /// Group a freshly finished unit joins
    pub fn for_role(role: Role) -> Option<Self> {
        match role {
            Role::Constructor => Some(GroupKind::Builders),
            Role::Base => Some(GroupKind::Bases),
            Role::Combat => Some(GroupKind::Assign),
            Role::Expansion | Role::Defense | Role::Other => None,
        }
    }
}

pub struct TopLevel {
    config: StrategyConfig,
    goals: Vec<GoalId>,
    builders: UnitGroup,
    bases: UnitGroup,
    assign: UnitGroup,
    battle: UnitGroup,
    rng: StdRng,
    resource_sites: Vec<Position>,
    posture: Posture,
    /// Battle-pool health recorded on entering Attack
    attack_health: f32,
    last_toggle: Tick,
    posture_goal: Option<GoalId>,
    retreat_goal: Option<GoalId>,
    /// Victim -> tick its last Defend goal was raised
    defend_cooldowns: AHashMap<ActorId, Tick>,
}

impl TopLevel {
    pub fn new(config: StrategyConfig) -> Self {
        Self::with_seed(config, 42)
    }

    /// Create with specific RNG seed for deterministic behavior
    pub fn with_seed(config: StrategyConfig, seed: u64) -> Self {
        Self {
            config,
            goals: Vec::new(),
            builders: UnitGroup::new("builders"),
            bases: UnitGroup::new("bases"),
            assign: UnitGroup::new("assign"),
            battle: UnitGroup::new("battle"),
            rng: StdRng::seed_from_u64(seed),
            resource_sites: Vec::new(),
            posture: Posture::Gather,
            attack_health: 0.0,
            last_toggle: 0,
            posture_goal: None,
            retreat_goal: None,
            defend_cooldowns: AHashMap::new(),
        }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: StrategyConfig) {
        self.config = config;
    }

    pub fn stack(&self) -> &[GoalId] {
        &self.goals
    }

    pub fn posture(&self) -> Posture {
        self.posture
    }

    pub fn resource_sites(&self) -> &[Position] {
        &self.resource_sites
    }

    pub fn group(&self, kind: GroupKind) -> &UnitGroup {
        match kind {
            GroupKind::Builders => &self.builders,
            GroupKind::Bases => &self.bases,
            GroupKind::Assign => &self.assign,
            GroupKind::Battle => &self.battle,
        }
    }

    pub fn group_mut(&mut self, kind: GroupKind) -> &mut UnitGroup {
        match kind {
            GroupKind::Builders => &mut self.builders,
            GroupKind::Bases => &mut self.bases,
            GroupKind::Assign => &mut self.assign,
            GroupKind::Battle => &mut self.battle,
        }
    }

    pub fn groups_mut(&mut self) -> [&mut UnitGroup; 4] {
        [
            &mut self.builders,
            &mut self.bases,
            &mut self.assign,
            &mut self.battle,
        ]
    }

    /// Every goal id held by this tier or one of its groups
    pub fn reachable_goals(&self) -> Vec<GoalId> {
        let mut ids = self.goals.clone();
        for group in [&self.builders, &self.bases, &self.assign, &self.battle] {
            ids.extend_from_slice(group.stack());
        }
        ids
    }

    /// Learn the resource sites from the host's feature list
    pub fn discover_sites(&mut self, host: &dyn Host) -> usize {
        for feature in host.features() {
            if feature.name != self.config.resource_feature {
                continue;
            }
            let duplicate = self.resource_sites.iter().any(|known| {
                sq_distance_2d(*known, feature.pos) <= DUPLICATE_SITE_RADIUS * DUPLICATE_SITE_RADIUS
            });
            if duplicate {
                tracing::debug!(feature = feature.id, "skipping duplicate resource site");
                continue;
            }
            self.resource_sites.push(feature.pos);
        }
        tracing::info!(count = self.resource_sites.len(), "resource sites discovered");
        self.resource_sites.len()
    }

    /// Place a finished unit in the group for its role
    pub fn assign_unit(&mut self, actor: ActorId, role: Role) -> Option<GroupKind> {
        let kind = GroupKind::for_role(role)?;
        self.group_mut(kind).assign(actor);
        Some(kind)
    }

    pub fn remove_unit(&mut self, actor: ActorId) {
        for group in self.groups_mut() {
            group.remove_member(actor);
        }
        self.defend_cooldowns.remove(&actor);
    }

    fn push_goal(
        &mut self,
        registry: &mut GoalRegistry,
        priority: i32,
        goal_type: GoalType,
        params: Vec<Param>,
        timeout: Option<Tick>,
    ) -> GoalId {
        let id = registry.create_with(priority, goal_type, params);
        if let Some(goal) = registry.get_mut(id) {
            goal.set_timeout(timeout);
        }
        self.add_goal(id);
        id
    }

    /// Re-derive the standing top-level goals
    pub fn find_goals(
        &mut self,
        ctx: &mut Ctx<'_>,
        influence: &mut dyn InfluenceField,
        known_enemies: &AHashSet<ActorId>,
    ) {
        influence.refresh(&*ctx.host, ctx.tick);
        self.find_expansions(ctx, influence);
        self.size_producers(ctx);
        self.manage_builder_retreat(ctx);
        self.update_posture(ctx, influence, known_enemies);
    }

    fn friendly_bases(ctx: &Ctx<'_>) -> Vec<UnitInfo> {
        ctx.host
            .units(Allegiance::Friendly)
            .into_iter()
            .filter_map(|id| ctx.host.unit(id))
            .filter(|u| u.finished && ctx.catalog.role_of(&u.def) == Role::Base)
            .collect()
    }

    fn nearest_base(ctx: &Ctx<'_>, to: Position) -> Option<Position> {
        Self::friendly_bases(ctx)
            .into_iter()
            .map(|b| b.pos)
            .min_by_key(|p| OrderedFloat(distance_2d(*p, to)))
    }

    fn find_expansions(&mut self, ctx: &mut Ctx<'_>, influence: &dyn InfluenceField) {
        let bases: Vec<Position> = Self::friendly_bases(ctx).into_iter().map(|b| b.pos).collect();
        if bases.is_empty() {
            tracing::debug!("no production base, skipping expansion discovery");
            return;
        }

        for site in self.resource_sites.clone() {
            let existing: Vec<GoalId> = self
                .goals
                .iter()
                .copied()
                .filter(|id| {
                    ctx.registry.get(*id).is_some_and(|g| {
                        g.goal_type() == GoalType::BuildExpansion
                            && !g.is_finished()
                            && g.point(0).is_some_and(|p| sq_distance_2d(p, site) < 1.0)
                    })
                })
                .collect();
            let executing = existing
                .iter()
                .any(|id| ctx.registry.get(*id).is_some_and(|g| g.is_executing()));

            if self.site_blocked(ctx, site) {
                if !executing {
                    for id in existing {
                        tracing::info!(goal = %id, "resource site taken, dropping expansion");
                        ctx.registry.remove(id);
                    }
                }
                continue;
            }
            if executing {
                continue;
            }

            let distance = bases
                .iter()
                .filter_map(|b| ctx.host.path_length(*b, site, &self.config.builder_path_profile))
                .min_by_key(|d| OrderedFloat(*d));
            let Some(distance) = distance else {
                tracing::debug!(?site, "resource site unreachable");
                continue;
            };

            let score = self.config.expansion_base_priority as f32
                + self.config.expansion_influence_weight * influence.value_at(site) as f32
                - self.config.expansion_distance_penalty * distance;
            let priority = score.round() as i32;

            let mut kept = false;
            for id in existing {
                let same = ctx.registry.get(id).is_some_and(|g| g.priority() == priority);
                if same && !kept {
                    kept = true;
                } else {
                    tracing::info!(goal = %id, priority, "replacing expansion goal");
                    ctx.registry.remove(id);
                }
            }
            if kept {
                continue;
            }

            let timeout = ctx.tick + self.config.expansion_timeout;
            let id = self.push_goal(
                ctx.registry,
                priority,
                GoalType::BuildExpansion,
                vec![Param::Point(site)],
                Some(timeout),
            );
            tracing::info!(goal = %id, ?site, priority, "expansion goal added");
        }
    }

    /// A structure on either side sits on the site
    fn site_blocked(&self, ctx: &Ctx<'_>, site: Position) -> bool {
        [Allegiance::Friendly, Allegiance::Enemy].into_iter().any(|side| {
            ctx.host
                .units_in_radius(side, site, self.config.expansion_blocked_radius)
                .into_iter()
                .filter_map(|id| ctx.host.unit(id))
                .any(|u| ctx.catalog.role_of(&u.def).is_structure())
        })
    }

    fn size_producers(&mut self, ctx: &mut Ctx<'_>) {
        let producers = ctx
            .host
            .units(Allegiance::Friendly)
            .into_iter()
            .filter_map(|id| ctx.host.unit(id))
            .filter(|u| u.finished && ctx.catalog.role_of(&u.def) == Role::Constructor)
            .count();
        let in_flight = self
            .goals
            .iter()
            .filter(|id| {
                ctx.registry
                    .get(**id)
                    .is_some_and(|g| g.goal_type() == GoalType::BuildProducer && !g.is_finished())
            })
            .count();
        tracing::debug!(producers, in_flight, target = self.config.producer_target, "producer count");

        if producers + in_flight < self.config.producer_target {
            let id = self.push_goal(
                ctx.registry,
                self.config.producer_priority,
                GoalType::BuildProducer,
                Vec::new(),
                None,
            );
            tracing::info!(goal = %id, "producer goal added");
        }
    }

    fn manage_builder_retreat(&mut self, ctx: &mut Ctx<'_>) {
        let expanding = self.has_goal_type(ctx.registry, GoalType::BuildExpansion);
        let outstanding = self.retreat_goal.filter(|id| ctx.registry.is_pending(*id));

        if expanding {
            if let Some(id) = outstanding {
                tracing::info!(goal = %id, "expansions available again, cancelling builder retreat");
                ctx.registry.remove(id);
            }
            self.retreat_goal = None;
            return;
        }
        if outstanding.is_some() {
            return;
        }
        self.retreat_goal = None;

        let Some(center) = self.builders.centroid(&*ctx.host) else {
            return;
        };
        let Some(base) = Self::nearest_base(ctx, center) else {
            return;
        };
        if distance_2d(center, base) <= self.config.retreat_deadband {
            return;
        }

        let id = self.push_goal(
            ctx.registry,
            self.config.retreat_priority,
            GoalType::Retreat,
            vec![Param::Point(base)],
            None,
        );
        tracing::info!(goal = %id, ?base, "builders retreating");
        self.retreat_goal = Some(id);
    }

    fn drop_posture_goal(&mut self, registry: &mut GoalRegistry) {
        if let Some(id) = self.posture_goal.take() {
            registry.remove(id);
        }
    }

    fn update_posture(
        &mut self,
        ctx: &mut Ctx<'_>,
        influence: &mut dyn InfluenceField,
        known_enemies: &AHashSet<ActorId>,
    ) {
        if self.battle.is_empty() && self.assign.is_empty() {
            return;
        }
        let tick = ctx.tick;
        let mut battle_health = self.battle.health(&*ctx.host);
        let assign_health = self.assign.health(&*ctx.host);

        if assign_health > battle_health && self.rng.gen::<f32>() < self.config.pool_swap_chance {
            tracing::info!(assign_health, battle_health, "swapping assign and battle pools");
            self.assign.swap_members(&mut self.battle);
            self.drop_posture_goal(ctx.registry);
            battle_health = assign_health;
        }

        let previous = self.posture;
        self.posture = match self.posture {
            Posture::Gather if battle_health >= self.config.attack_min_health => Posture::Attack,
            Posture::Attack
                if battle_health < self.attack_health * self.config.gather_health_ratio =>
            {
                Posture::Gather
            }
            unchanged => unchanged,
        };
        if self.posture == previous
            && tick.saturating_sub(self.last_toggle) >= self.config.toggle_cooldown
            && self.rng.gen::<f32>() < self.config.toggle_chance
        {
            let flipped = self.posture.flipped();
            if flipped == Posture::Gather || battle_health > 0.0 {
                self.posture = flipped;
            }
        }
        if self.posture != previous {
            tracing::info!(from = ?previous, to = ?self.posture, battle_health, "posture changed");
            self.last_toggle = tick;
            if self.posture == Posture::Attack {
                self.attack_health = battle_health;
            }
            self.drop_posture_goal(ctx.registry);
        }

        if self.battle.is_empty() || self.posture_goal.is_some_and(|id| ctx.registry.is_pending(id)) {
            return;
        }
        self.posture_goal = None;
        let Some(center) = self.battle.centroid(&*ctx.host) else {
            return;
        };

        let (priority, goal_type, param) = match self.posture {
            Posture::Gather => {
                let Some(rally) = Self::nearest_base(ctx, center) else {
                    return;
                };
                if distance_2d(center, rally) <= self.config.retreat_deadband {
                    return;
                }
                (self.config.gather_priority, GoalType::Move, Param::Point(rally))
            }
            Posture::Attack => {
                let Some(area) = self.pick_attack_area(ctx, influence, known_enemies, center) else {
                    tracing::debug!("no contested area to attack");
                    return;
                };
                match self.high_value_target(ctx, area) {
                    Some(target) => (self.config.attack_priority, GoalType::AttackUnit, Param::Actor(target)),
                    None => (self.config.attack_priority, GoalType::AttackArea, Param::Point(area)),
                }
            }
        };

        let id = self.push_goal(ctx.registry, priority, goal_type, vec![param], None);
        tracing::info!(goal = %id, ?goal_type, posture = ?self.posture, "posture goal added");
        self.posture_goal = Some(id);
    }

    /// Weakest enemy-held minimum of the influence field, nearest first on
    /// ties; falls back to the nearest known enemy
    fn pick_attack_area(
        &self,
        ctx: &Ctx<'_>,
        influence: &mut dyn InfluenceField,
        known_enemies: &AHashSet<ActorId>,
        from: Position,
    ) -> Option<Position> {
        let contested = influence
            .local_minima(self.config.minima_radius)
            .into_iter()
            .filter(|(value, _)| *value < 0)
            .max_by_key(|(value, point)| (*value, Reverse(OrderedFloat(distance_2d(*point, from)))))
            .map(|(_, point)| point);

        let mut area = contested.or_else(|| {
            known_enemies
                .iter()
                .filter_map(|id| ctx.host.unit(*id))
                .map(|u| u.pos)
                .min_by_key(|p| OrderedFloat(distance_2d(*p, from)))
        })?;
        area.y = ctx.host.ground_height(area.x, area.z);
        Some(area)
    }

    fn high_value_target(&self, ctx: &Ctx<'_>, area: Position) -> Option<ActorId> {
        ctx.host
            .units_in_radius(Allegiance::Enemy, area, self.config.target_search_radius)
            .into_iter()
            .filter_map(|id| ctx.host.unit(id))
            .filter(|u| ctx.catalog.role_of(&u.def).is_high_value())
            .min_by_key(|u| OrderedFloat(distance_2d(u.pos, area)))
            .map(|u| u.id)
    }

    /// Raise a Defend goal when a protected unit takes real damage from an
    /// enemy; returns the new goal
    pub fn on_actor_damaged(
        &mut self,
        ctx: &mut Ctx<'_>,
        victim: ActorId,
        attacker: Option<ActorId>,
        damage: f32,
    ) -> Option<GoalId> {
        if damage < self.config.defend_min_damage {
            return None;
        }
        let info = ctx.host.unit(victim)?;
        if info.side != Allegiance::Friendly || !ctx.catalog.role_of(&info.def).is_protected() {
            return None;
        }
        // an unseen attacker is fought where the damage landed
        let pos = match attacker.and_then(|a| ctx.host.unit(a)) {
            Some(a) if a.side == Allegiance::Enemy => a.pos,
            Some(_) => return None,
            None => info.pos,
        };

        let cooling = self
            .defend_cooldowns
            .get(&victim)
            .is_some_and(|last| ctx.tick < last + self.config.defend_cooldown);
        if cooling {
            return None;
        }
        self.defend_cooldowns.insert(victim, ctx.tick);

        let timeout = ctx.tick + self.config.defend_timeout;
        let id = self.push_goal(
            ctx.registry,
            self.config.defend_priority,
            GoalType::DefendArea,
            vec![Param::Point(pos)],
            Some(timeout),
        );
        tracing::info!(goal = %id, %victim, ?attacker, damage, "defend goal added");
        Some(id)
    }
}

impl<'a> GoalProcessor<Ctx<'a>> for TopLevel {
    fn goals(&self) -> &[GoalId] {
        &self.goals
    }

    fn goals_mut(&mut self) -> &mut Vec<GoalId> {
        &mut self.goals
    }

    fn process_goal(&mut self, ctx: &mut Ctx<'a>, id: GoalId) -> Verdict {
        let Some(goal) = ctx.registry.get(id) else {
            return Verdict::PopContinue;
        };
        if goal.is_finished() {
            return Verdict::PopContinue;
        }
        if goal.is_executing() || goal.is_delegated() {
            return Verdict::Continue;
        }

        let goal_type = goal.goal_type();
        let malformed = if goal_type.needs_point() {
            goal.point(0).is_none()
        } else {
            goal_type == GoalType::AttackUnit && goal.actor(0).is_none()
        };
        if malformed {
            if cfg!(debug_assertions) {
                panic!("malformed top-level goal {id}: {goal_type:?}");
            }
            tracing::error!(goal = %id, ?goal_type, params = goal.params().len(), "malformed top-level goal, removing");
            return Verdict::PopContinue;
        }
        let (priority, params) = (goal.priority(), goal.params().to_vec());

        let kind = GroupKind::for_goal(goal_type);
        match delegate(ctx.registry, id, goal_type, priority, params, ClaimPolicy::Exclusive) {
            Some(child) => {
                tracing::debug!(goal = %id, %child, group = ?kind, "delegated to group");
                self.group_mut(kind).add_goal(child);
                Verdict::Continue
            }
            None => Verdict::PopContinue,
        }
    }
}
