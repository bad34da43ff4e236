//! Commander integration tests against the sandbox host

use glam::Vec3;

use skirmish_ai::ai::Commander;
use skirmish_ai::core::config::{NoScripting, TomlTunables, Tunables};
use skirmish_ai::core::UnitCatalog;
use skirmish_ai::goal::GoalType;
use skirmish_ai::host::{Allegiance, Command, Host};
use skirmish_ai::influence::{InfluenceMap, UnitWeights};
use skirmish_ai::sandbox::{Sandbox, SandboxEvent};

fn commander(sandbox: Sandbox, tunables: Box<dyn Tunables>) -> Commander<Sandbox> {
    let influence = InfluenceMap::new(4096.0, 4096.0, 64.0, UnitWeights::default());
    let mut cmd =
        Commander::new(sandbox, tunables, UnitCatalog::default(), Box::new(influence)).unwrap();
    for id in cmd.host().units(Allegiance::Friendly) {
        cmd.on_actor_created(id);
        cmd.on_actor_finished(id);
    }
    cmd
}

fn deterministic() -> Box<dyn Tunables> {
    let mut t = TomlTunables::default();
    t.set("toggle_chance", 0.0);
    t.set("pool_swap_chance", 0.0);
    Box::new(t)
}

/// Step the host, forward its notifications, then update
fn run(cmd: &mut Commander<Sandbox>, ticks: u64) {
    for _ in 0..ticks {
        for event in cmd.host_mut().step() {
            match event {
                SandboxEvent::Created(id) => cmd.on_actor_created(id),
                SandboxEvent::Finished(id) => cmd.on_actor_finished(id),
                SandboxEvent::Idle(id) => cmd.on_actor_idle(id),
                SandboxEvent::Damaged {
                    victim,
                    attacker,
                    damage,
                } => cmd.on_actor_damaged(victim, Some(attacker), damage),
                SandboxEvent::Destroyed { unit, attacker } => cmd.on_actor_destroyed(unit, attacker),
                SandboxEvent::EnemyDestroyed { enemy, attacker } => {
                    cmd.on_enemy_destroyed(enemy, Some(attacker))
                }
            }
        }
        cmd.on_tick();
    }
}

fn pending_of(cmd: &Commander<Sandbox>, goal_type: GoalType) -> usize {
    cmd.registry()
        .iter()
        .filter(|g| g.goal_type() == goal_type && !g.is_finished())
        .count()
}

fn strategic_expansions(cmd: &Commander<Sandbox>) -> Vec<skirmish_ai::goal::GoalId> {
    cmd.top()
        .stack()
        .iter()
        .copied()
        .filter(|id| {
            cmd.registry()
                .get(*id)
                .is_some_and(|g| g.goal_type() == GoalType::BuildExpansion && !g.is_finished())
        })
        .collect()
}

#[test]
fn test_builder_claims_resource_site() {
    let mut sb = Sandbox::new();
    let home = Vec3::new(300.0, 0.0, 300.0);
    let site = Vec3::new(900.0, 0.0, 300.0);
    let base = sb.spawn(Allegiance::Friendly, "kernel", home);
    let builder = sb.spawn(Allegiance::Friendly, "assembler", home + Vec3::X * 80.0);
    sb.add_feature("geovent", site);
    let mut cmd = commander(sb, Box::new(NoScripting));

    run(&mut cmd, 1);
    assert_eq!(
        cmd.host().orders_for(builder),
        vec![&Command::Build {
            def: "socket".to_string(),
            pos: site
        }]
    );
    assert_eq!(
        cmd.host().orders_for(base),
        vec![&Command::Produce {
            def: "assembler".to_string()
        }]
    );

    // 520 units at 4 per tick
    run(&mut cmd, 200);
    let host = cmd.host();
    let socket = host
        .units_in_radius(Allegiance::Friendly, site, 1.0)
        .into_iter()
        .filter_map(|id| host.unit(id))
        .find(|u| u.def == "socket");
    assert!(socket.is_some());
    assert_eq!(pending_of(&cmd, GoalType::BuildExpansion), 0);

    // the new producer came out of the base and joined the builders
    let assemblers = host
        .units(Allegiance::Friendly)
        .into_iter()
        .filter_map(|id| host.unit(id))
        .filter(|u| u.def == "assembler")
        .count();
    assert_eq!(assemblers, 2);
    assert_eq!(cmd.stats().sweeps, 201);
}

#[test]
fn test_lost_builder_aborts_and_goal_is_rederived() {
    let mut sb = Sandbox::new();
    let home = Vec3::new(300.0, 0.0, 300.0);
    let site = Vec3::new(1500.0, 0.0, 300.0);
    sb.spawn(Allegiance::Friendly, "kernel", home);
    let builder = sb.spawn(Allegiance::Friendly, "assembler", home + Vec3::X * 80.0);
    sb.add_feature("geovent", site);
    let mut cmd = commander(sb, Box::new(NoScripting));

    run(&mut cmd, 5);
    let before = strategic_expansions(&cmd);
    assert_eq!(before.len(), 1);
    assert!(cmd.registry().is_pending(before[0]));

    cmd.host_mut().kill(builder);
    cmd.on_actor_destroyed(builder, None);
    assert!(!cmd.registry().is_pending(before[0]));
    assert!(cmd.unit_ai(builder).is_none());

    cmd.host_mut().set_tick(300);
    run(&mut cmd, 1);
    let after = strategic_expansions(&cmd);
    assert_eq!(after.len(), 1);
    assert_ne!(after, before);
    assert!(cmd.registry().is_pending(after[0]));
    assert!(!cmd.top().stack().contains(&before[0]));
}

#[test]
fn test_base_under_fire_calls_the_reserve() {
    let mut sb = Sandbox::new();
    let home = Vec3::new(300.0, 0.0, 300.0);
    sb.spawn_with(Allegiance::Friendly, "kernel", home, 3000.0, true);
    let guards = [
        sb.spawn(Allegiance::Friendly, "bit", Vec3::new(300.0, 0.0, 700.0)),
        sb.spawn(Allegiance::Friendly, "bit", Vec3::new(330.0, 0.0, 700.0)),
    ];
    let raider_pos = home + Vec3::X * 40.0;
    let raider = sb.spawn(Allegiance::Enemy, "bug", raider_pos);
    sb.arm(raider, 10.0);
    let mut cmd = commander(sb, deterministic());

    run(&mut cmd, 5);
    assert_eq!(cmd.stats().defend_goals, 1);
    for guard in guards {
        assert_eq!(
            cmd.host().orders_for(guard),
            vec![&Command::Fight(raider_pos)]
        );
    }
    assert_eq!(pending_of(&cmd, GoalType::DefendArea), 1 + 1 + guards.len());
}
