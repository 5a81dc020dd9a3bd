//! Scene Save/Load: round-trip a small garden through a scene file.
//!
//! Builds a tree with a capability slot, a growable collection, persisted
//! properties, and two references to the same node. Saves it, scribbles over
//! the live tree, then loads the file back and prints what came out.
//!
//! Run with: `RUST_LOG=info cargo run -p arbor --example scene_save_load`

use arbor::prelude::*;

// ── Node types ───────────────────────────────────────────────────────────

#[derive(Default)]
struct Sprinkler {
    core: NodeCore,
    litres_per_minute: f32,
}
node_base!(Sprinkler);

impl Node for Sprinkler {
    fn save_properties(&self, props: &mut PropertyMap) {
        props.put("litres_per_minute", &self.litres_per_minute);
    }

    fn load_properties(&mut self, props: &PropertyReader<'_>) -> Result<(), PersistError> {
        self.litres_per_minute = props.get_or("litres_per_minute", 0.0)?;
        Ok(())
    }
}

#[derive(Default)]
struct Plant {
    core: NodeCore,
    species: String,
    height: f32,
    /// Runtime only; not persisted.
    wilting: bool,
}
node_base!(Plant);

impl Plant {
    fn new(species: &str, height: f32, x: f32) -> Self {
        Self {
            core: NodeCore::new()
                .with_transform(Transform2d::from_xy(x, 0.0))
                .with_body(PhysicsBody::collider().with_shape(ColliderShape::Ball { radius: 0.4 })),
            species: species.to_string(),
            height,
            wilting: false,
        }
    }
}

impl Node for Plant {
    fn save_properties(&self, props: &mut PropertyMap) {
        props.put("species", &self.species);
        props.put("height", &self.height);
    }

    fn load_properties(&mut self, props: &PropertyReader<'_>) -> Result<(), PersistError> {
        self.species = props.get_or("species", String::new())?;
        self.height = props.get_or("height", 0.0)?;
        Ok(())
    }
}

struct Garden {
    core: NodeCore,
    name: String,
    favourite: Option<NodeId>,
    next_to_water: Option<NodeId>,
}
node_base!(Garden);

impl Garden {
    const SPRINKLER: Capability<Sprinkler> = Capability::new("sprinkler");
    const PLANTS: Collection<Plant> = Collection::new("plants");
}

impl Default for Garden {
    fn default() -> Self {
        Self {
            core: NodeCore::new()
                .with_capability(Self::SPRINKLER, Sprinkler::default())
                .with_collection(Self::PLANTS),
            name: String::new(),
            favourite: None,
            next_to_water: None,
        }
    }
}

impl Node for Garden {
    fn on_awake(&mut self, _ctx: &mut NodeContext<'_>) {
        log::info!("garden `{}` awake", self.name);
    }

    fn save_properties(&self, props: &mut PropertyMap) {
        props.put("name", &self.name);
        props.put_ref("favourite", self.favourite);
        props.put_ref("next_to_water", self.next_to_water);
    }

    fn load_properties(&mut self, props: &PropertyReader<'_>) -> Result<(), PersistError> {
        self.name = props.get_or("name", String::new())?;
        self.favourite = props.get_ref("favourite")?;
        self.next_to_water = props.get_ref("next_to_water")?;
        Ok(())
    }
}

fn describe(hierarchy: &Hierarchy) {
    let Some(garden) = hierarchy.root_as::<Garden>() else {
        log::warn!("root is not a garden");
        return;
    };
    let sprinkler = garden.core.slot(Garden::SPRINKLER);
    log::info!(
        "garden `{}`: sprinkler {} l/min, {} plants",
        garden.name,
        sprinkler.litres_per_minute,
        garden.core.collection_len(Garden::PLANTS)
    );
    for plant in garden.core.collection(Garden::PLANTS) {
        let tags = [
            (garden.favourite == Some(plant.core.id())).then_some("favourite"),
            (garden.next_to_water == Some(plant.core.id())).then_some("next to water"),
        ];
        log::info!(
            "  {} {:.1}m at {} wilting={} {:?}",
            plant.species,
            plant.height,
            plant.core.transform.position,
            plant.wilting,
            tags.iter().flatten().collect::<Vec<_>>()
        );
    }
}

fn main() -> Result<(), KernelError> {
    env_logger::init();

    let path = std::env::temp_dir().join("arbor_garden.scene");
    let config = KernelConfig::default().with_save_path(&path);
    let mut hierarchy = Hierarchy::new(&config);
    hierarchy.registry_mut().register::<Garden>();
    hierarchy.registry_mut().register::<Plant>();
    hierarchy.registry_mut().register::<Sprinkler>();

    let mut garden = Garden {
        name: "Back yard".into(),
        ..Default::default()
    };
    garden.core.slot_mut(Garden::SPRINKLER).litres_per_minute = 4.5;
    let target = garden.core.target(Garden::PLANTS);
    hierarchy.set_root(garden);

    let fern = Plant::new("fern", 0.6, -2.0);
    let fern_id = fern.core.id();
    hierarchy.register_node(fern, target);
    hierarchy.register_node(Plant::new("tomato", 1.2, 0.0), target);
    hierarchy.register_node(Plant::new("basil", 0.3, 2.0), target);
    hierarchy.awake()?;

    if let Some(garden) = hierarchy.root_as_mut::<Garden>() {
        garden.favourite = Some(fern_id);
        garden.next_to_water = Some(fern_id);
    }
    describe(&hierarchy);

    hierarchy.save_current_root_node()?;
    log::info!("saved:\n{}", std::fs::read_to_string(&path)?);

    if let Some(garden) = hierarchy.root_as_mut::<Garden>() {
        garden.name = "Scribbled".into();
        garden.core.slot_mut(Garden::SPRINKLER).litres_per_minute = 0.0;
    }

    hierarchy.load_root_node()?;
    hierarchy.awake()?;
    describe(&hierarchy);

    if let Some(garden) = hierarchy.root_as::<Garden>() {
        assert_eq!(garden.favourite, garden.next_to_water);
    }
    Ok(())
}
