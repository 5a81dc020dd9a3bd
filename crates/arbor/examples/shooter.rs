//! Shooter: headless run of a spawning scene.
//!
//! A ship sweeps left and right while its blaster auto-fires. Bullets are
//! trigger bodies registered into the blaster's `bullets` collection; a row
//! of target triggers counts hits. The blaster removes its own spent bullets.
//! Halfway through, a Space press stops the blaster.
//!
//! Run with: `RUST_LOG=info cargo run -p arbor --example shooter`

use arbor::prelude::*;

const FRAMES: u32 = 600;
const DT: f32 = 1.0 / 60.0;

// ── Bullet ───────────────────────────────────────────────────────────────

struct Bullet {
    core: NodeCore,
    speed: f32,
    spent: bool,
}
node_base!(Bullet);

impl Bullet {
    fn at(position: Vec2) -> Self {
        let body = PhysicsBody::trigger().with_shape(ColliderShape::Ball { radius: 0.15 });
        Self {
            core: NodeCore::new()
                .with_transform(Transform2d::from_xy(position.x, position.y))
                .with_body(body),
            speed: 14.0,
            spent: false,
        }
    }
}

impl Node for Bullet {
    fn on_update(&mut self, ctx: &mut NodeContext<'_>) {
        self.core.transform.position.y += self.speed * ctx.delta_secs();
        if self.core.transform.position.y > 14.0 {
            self.spent = true;
        }
    }

    fn begin_trigger(&mut self, _ctx: &mut NodeContext<'_>, other: &ContactPeer) {
        if other.is::<Target>() {
            self.spent = true;
        }
    }

    fn on_draw(&mut self, _ctx: &mut NodeContext<'_>, draw: &mut DrawList) {
        draw.quad(self.core.id(), &self.core.transform, None, [1.0, 0.9, 0.2, 1.0]);
    }
}

// ── Blaster ──────────────────────────────────────────────────────────────

struct Blaster {
    core: NodeCore,
    cooldown: f32,
    current_cooldown: f32,
    is_shooting: bool,
}
node_base!(Blaster);

impl Blaster {
    const BULLETS: Collection<Bullet> = Collection::new("bullets");
}

impl Default for Blaster {
    fn default() -> Self {
        Self {
            core: NodeCore::new().with_collection(Self::BULLETS),
            cooldown: 0.25,
            current_cooldown: 0.25,
            is_shooting: true,
        }
    }
}

impl Node for Blaster {
    fn on_update(&mut self, ctx: &mut NodeContext<'_>) {
        let spent: Vec<NodeId> = self
            .core
            .collection(Self::BULLETS)
            .filter(|b| b.spent)
            .map(|b| b.core.id())
            .collect();
        for id in spent {
            if let (Some(mut bullet), Some(world)) = (self.core.detach_child(id), ctx.physics_mut()) {
                release_physics(bullet.as_mut(), world);
            }
        }

        if !self.is_shooting {
            return;
        }
        self.current_cooldown -= ctx.delta_secs();
        if self.current_cooldown <= 0.0 {
            let target = self.core.target(Self::BULLETS);
            ctx.register(Bullet::at(self.core.transform.position), target);
            self.current_cooldown = self.cooldown;
        }
    }
}

// ── Ship ─────────────────────────────────────────────────────────────────

struct Ship {
    core: NodeCore,
}
node_base!(Ship);

impl Ship {
    const BLASTER: Capability<Blaster> = Capability::new("blaster");

    fn new() -> Self {
        Self {
            core: NodeCore::new()
                .with_transform(Transform2d::from_xy(0.0, -8.0))
                .with_capability(Self::BLASTER, Blaster::default()),
        }
    }
}

impl Node for Ship {
    fn on_update(&mut self, ctx: &mut NodeContext<'_>) {
        let t = ctx.time.elapsed_secs() as f32;
        self.core.transform.position.x = 6.0 * (t * 0.8).sin();

        let muzzle = self.core.transform.position + Vec2::new(0.0, 0.6);
        let blaster = self.core.slot_mut(Self::BLASTER);
        blaster.core.transform.position = muzzle;
        if ctx.input.just_pressed(KeyCode::Space) {
            blaster.is_shooting = !blaster.is_shooting;
            log::info!("blaster {}", if blaster.is_shooting { "on" } else { "off" });
        }
    }

    fn on_draw(&mut self, _ctx: &mut NodeContext<'_>, draw: &mut DrawList) {
        draw.quad(self.core.id(), &self.core.transform, Some("ship.png"), [1.0; 4]);
    }
}

// ── Target ───────────────────────────────────────────────────────────────

struct Target {
    core: NodeCore,
    hits: u32,
}
node_base!(Target);

impl Target {
    fn at(x: f32, y: f32) -> Self {
        Self {
            core: NodeCore::new()
                .with_transform(Transform2d::from_xy(x, y).with_scale(1.5))
                .with_body(PhysicsBody::trigger().with_shape(ColliderShape::Cuboid { hx: 0.75, hy: 0.75 })),
            hits: 0,
        }
    }
}

impl Node for Target {
    fn begin_trigger(&mut self, _ctx: &mut NodeContext<'_>, other: &ContactPeer) {
        if other.is::<Bullet>() {
            self.hits += 1;
        }
    }

    fn on_draw(&mut self, _ctx: &mut NodeContext<'_>, draw: &mut DrawList) {
        let heat = (self.hits as f32 / 10.0).min(1.0);
        draw.quad(self.core.id(), &self.core.transform, None, [1.0, 1.0 - heat, 1.0 - heat, 1.0]);
    }
}

fn level() -> Group {
    let mut core = NodeCore::new().with_child(Ship::new());
    for i in 0..5 {
        core = core.with_child(Target::at(-6.0 + 3.0 * i as f32, 8.0));
    }
    Group::with_core(core)
}

fn main() -> Result<(), KernelError> {
    env_logger::init();

    let config = KernelConfig::default().with_gravity(Vec2::ZERO);
    let mut engine = Engine::new(config)?.with_scene(level());
    engine.set_projection(DrawList::orthographic(32.0, 24.0));

    for frame in 0..FRAMES {
        if frame == FRAMES / 2 {
            engine.hierarchy_mut().input_mut().press(KeyCode::Space);
        }
        let quads = engine.tick(DT)?.len();
        if frame % 120 == 0 {
            log::info!(
                "frame {frame}: {quads} quads, {} nodes, {} bodies",
                engine.hierarchy().node_count(),
                engine.hierarchy().physics().map_or(0, PhysicsWorld::body_count),
            );
        }
    }

    let hits: Vec<u32> = engine
        .hierarchy()
        .root()
        .map(|root| {
            root.core()
                .children()
                .filter_map(|c| c.as_any().downcast_ref::<Target>())
                .map(|t| t.hits)
                .collect()
        })
        .unwrap_or_default();
    log::info!("target hits after {FRAMES} frames: {hits:?}");
    Ok(())
}
