//! Static room layout: the mesh catalog and every object's placement.

use std::path::Path;

use glam::Vec3;
use roomview_assets::MeshLibrary;
use roomview_common::AxisRotation as R;
use roomview_common::{AxisRotation, MeshHandle, Placement};

/// Mesh handles, one per distinct model file.
pub mod mesh {
    use roomview_common::MeshHandle;

    pub const ROOM: MeshHandle = MeshHandle(0);
    pub const WOODEN_PLANE: MeshHandle = MeshHandle(1);
    pub const RUG: MeshHandle = MeshHandle(2);
    pub const NUMBERED_DICE: MeshHandle = MeshHandle(3);
    pub const BIKE: MeshHandle = MeshHandle(4);
    pub const MUG: MeshHandle = MeshHandle(5);
    pub const PONY: MeshHandle = MeshHandle(6);
    pub const PONY_HOUSE: MeshHandle = MeshHandle(7);
    pub const FOX: MeshHandle = MeshHandle(8);
    pub const SLED: MeshHandle = MeshHandle(9);
    pub const DOLL_HOUSE: MeshHandle = MeshHandle(10);
    pub const RACKET: MeshHandle = MeshHandle(11);
    pub const TENNIS_BALL: MeshHandle = MeshHandle(12);
    pub const SOCCER_BALL: MeshHandle = MeshHandle(13);
    pub const DOLL: MeshHandle = MeshHandle(14);
    pub const TOY_PLANE: MeshHandle = MeshHandle(15);
    pub const DOG_TOY: MeshHandle = MeshHandle(16);
    pub const CRAYONS: MeshHandle = MeshHandle(17);
    pub const CAT_TOY: MeshHandle = MeshHandle(18);
    pub const PAPER_DOLL: MeshHandle = MeshHandle(19);
    pub const FIGURINE: MeshHandle = MeshHandle(20);
    pub const TRUCK: MeshHandle = MeshHandle(21);
    pub const BALLOON: MeshHandle = MeshHandle(22);
    pub const SHELF: MeshHandle = MeshHandle(23);
    pub const PICTURE: MeshHandle = MeshHandle(24);
    pub const FRAME: MeshHandle = MeshHandle(25);
    pub const BOOKS: MeshHandle = MeshHandle(26);
}

/// A model file and the handle it loads into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshAsset {
    pub handle: MeshHandle,
    pub name: &'static str,
    /// Relative to the asset root.
    pub path: &'static str,
}

const fn asset(handle: MeshHandle, name: &'static str, path: &'static str) -> MeshAsset {
    MeshAsset { handle, name, path }
}

pub const MESH_CATALOG: &[MeshAsset] = &[
    asset(mesh::ROOM, "room", "models/room/Room/Sketchfab_2020_02_08_20_59_54.obj"),
    asset(mesh::WOODEN_PLANE, "wooden plane", "models/woodenPlane/Wooden_Plane.obj"),
    asset(mesh::RUG, "rug", "models/rug/rug.obj"),
    asset(mesh::NUMBERED_DICE, "numbered dice", "models/numberedDice/Dice_Set/Dice_Set/DiceSet.obj"),
    asset(mesh::BIKE, "bike", "models/smallBike/Wooden_bicycle.obj"),
    asset(mesh::MUG, "mug", "models/mug/Break.obj"),
    asset(mesh::PONY, "pony", "models/pony/Pony.obj"),
    asset(mesh::PONY_HOUSE, "pony house", "models/ponyHouse/Sugarcube_Corner.obj"),
    asset(mesh::FOX, "fox", "models/toyFox/obj/obj/obj.obj"),
    asset(mesh::SLED, "sled", "models/sled/SledNew_obj/SledNew.obj"),
    asset(mesh::DOLL_HOUSE, "doll house", "models/dollHouse/10587_Doll_House_v3_L2.obj"),
    asset(mesh::RACKET, "racket", "models/racket/10540_Tennis_racket_V2_L3.obj"),
    asset(mesh::TENNIS_BALL, "tennis ball", "models/tennisball/10539_tennis_ball_L3.obj"),
    asset(mesh::SOCCER_BALL, "soccer ball", "models/soccer/Sketchfab_2020_08_23_19_50_55.obj"),
    asset(mesh::DOLL, "doll", "models/doll/10578_barbiedoll_v1_L3.obj"),
    asset(mesh::TOY_PLANE, "toy plane", "models/planeToy/ToyPlane_OBJ/ToyPlane/ToyPlane.obj"),
    asset(mesh::DOG_TOY, "dog toy", "models/stuffedToy/11706_stuffed_animal_L2.obj"),
    asset(mesh::CRAYONS, "crayons", "models/crayons/11676_Crayons_v1_L3.obj"),
    asset(mesh::CAT_TOY, "cat toy", "models/catToy/20430_Cat_v1_NEW.obj"),
    asset(mesh::PAPER_DOLL, "paper doll", "models/paperDoll/11679_doll_v3_L3.obj"),
    asset(mesh::FIGURINE, "figurine", "models/legoMiniFigurine/lego.obj"),
    asset(mesh::TRUCK, "truck", "models/truckToy/Leksaksbil.obj"),
    asset(mesh::BALLOON, "balloon", "models/balloon/smeerws_2018-02-16_12-52-58.obj"),
    asset(mesh::SHELF, "shelf", "models/shelf/shelf/shelf.obj"),
    asset(mesh::PICTURE, "picture", "models/picture/dog.obj"),
    asset(mesh::FRAME, "frame", "models/largeFrame/frame.obj"),
    asset(mesh::BOOKS, "books", "models/book/books.obj"),
];

/// A statically placed object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneObject {
    pub name: &'static str,
    pub mesh: MeshHandle,
    pub placement: Placement,
    pub albedo: Vec3,
}

/// One slot in the draw order. Animated objects compute their transform
/// from animation state each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawSlot {
    Fixed(SceneObject),
    WoodenPlane,
    Balloon,
}

impl DrawSlot {
    pub fn mesh(&self) -> MeshHandle {
        match self {
            DrawSlot::Fixed(object) => object.mesh,
            DrawSlot::WoodenPlane => mesh::WOODEN_PLANE,
            DrawSlot::Balloon => mesh::BALLOON,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DrawSlot::Fixed(object) => object.name,
            DrawSlot::WoodenPlane => "wooden plane",
            DrawSlot::Balloon => "balloon",
        }
    }
}

const fn fixed(
    name: &'static str,
    mesh: MeshHandle,
    rotations: &'static [AxisRotation],
    translation: Vec3,
    scale: f32,
    albedo: Vec3,
) -> DrawSlot {
    DrawSlot::Fixed(SceneObject {
        name,
        mesh,
        placement: Placement::new(rotations, translation, scale),
        albedo,
    })
}

const fn v(x: f32, y: f32, z: f32) -> Vec3 {
    Vec3::new(x, y, z)
}

/// Every object in draw order.
#[rustfmt::skip]
pub const DRAW_ORDER: &[DrawSlot] = &[
    fixed("room", mesh::ROOM, &[], v(-0.18, -0.38, -0.1), 0.6, v(0.86, 0.82, 0.74)),
    DrawSlot::WoodenPlane,
    fixed("rug", mesh::RUG, &[], v(-0.04, -0.555, 0.0), 0.0100007, v(0.62, 0.36, 0.42)),
    fixed("bike", mesh::BIKE, &[], v(0.25, -0.565, -1.18), 0.370001, v(0.72, 0.52, 0.32)),
    fixed("mug", mesh::MUG, &[R::y(63.5)], v(-0.68, 0.03, 1.1), 0.0400007, v(0.9, 0.9, 0.86)),
    DrawSlot::Balloon,
    fixed("racket", mesh::RACKET, &[R::y(-14.5), R::x(90.5)], v(-0.32, 0.839999, 0.53), 0.00700933, v(0.3, 0.45, 0.8)),
    fixed("toy plane", mesh::TOY_PLANE, &[R::y(171.5)], v(0.979999, -0.06, -0.06), 0.0110093, v(0.85, 0.25, 0.2)),
    fixed("fox", mesh::FOX, &[R::y(96.5)], v(-1.01, -0.2, 0.2), 0.0100007, v(0.9, 0.5, 0.2)),
    fixed("pony", mesh::PONY, &[R::y(-19.5)], v(-0.44, -0.55, -0.939999), 0.0310093, v(0.95, 0.7, 0.85)),
    fixed("dog toy", mesh::DOG_TOY, &[R::y(63.0), R::x(-92.5)], v(0.23, 1.17, -0.5), 0.00600933, v(0.65, 0.5, 0.38)),
    fixed("sled", mesh::SLED, &[R::y(-89.0)], v(0.69, -0.56, 1.0), 0.55, v(0.6, 0.35, 0.2)),
    fixed("tennis ball", mesh::TENNIS_BALL, &[], v(-0.42, -0.54, 0.82), 0.0100093, v(0.8, 0.9, 0.25)),
    fixed("doll", mesh::DOLL, &[R::y(13.0), R::x(-183.5)], v(-0.34, 0.54, -0.17), 0.00100932, v(0.95, 0.75, 0.7)),
    fixed("doll house", mesh::DOLL_HOUSE, &[R::x(-92.5)], v(-0.51, -0.26, -0.59), 0.00600933, v(0.92, 0.8, 0.8)),
    fixed("soccer ball", mesh::SOCCER_BALL, &[], v(-0.989999, -0.21, 0.2), 0.0710093, v(0.92, 0.92, 0.92)),
    fixed("pony house", mesh::PONY_HOUSE, &[], v(-0.03, -0.56, -1.34), 0.00300932, v(0.9, 0.6, 0.75)),
    fixed("crayons", mesh::CRAYONS, &[R::x(-92.1)], v(0.77, -0.74, 0.0), 0.0100093, v(0.3, 0.7, 0.35)),
    fixed("paper doll", mesh::PAPER_DOLL, &[R::y(-235.0), R::x(-183.0)], v(-0.359999, 0.539999, -0.36), 0.00600933, v(0.95, 0.9, 0.8)),
    fixed("cat toy", mesh::CAT_TOY, &[R::y(71.0), R::x(-91.5)], v(-0.17, 0.969999, -0.44), 0.0120093, v(0.55, 0.55, 0.6)),
    fixed("figurine", mesh::FIGURINE, &[], v(0.4, -0.52, -0.26), 1.65903, v(0.95, 0.8, 0.1)),
    fixed("numbered dice", mesh::NUMBERED_DICE, &[R::y(52.0)], v(1.12, -0.55, -0.05), 0.0120093, v(0.9, 0.15, 0.15)),
    fixed("truck", mesh::TRUCK, &[R::y(143.5)], v(0.85, 0.1105, -0.54), 0.0700093, v(0.2, 0.4, 0.75)),
    fixed("shelf", mesh::SHELF, &[], v(-1.11, 0.329999, 0.79), 0.454007, v(0.55, 0.4, 0.28)),
    fixed("shelf", mesh::SHELF, &[], v(-1.12, 0.329999, -1.15), 0.454007, v(0.55, 0.4, 0.28)),
    fixed("picture", mesh::PICTURE, &[], v(-1.06, 0.329999, 0.82), 0.128009, v(0.75, 0.7, 0.6)),
    fixed("frame", mesh::FRAME, &[R::y(179.5)], v(-0.999999, 0.339999, 0.45), 0.137009, v(0.5, 0.35, 0.25)),
    fixed("books", mesh::BOOKS, &[R::y(-176.0)], v(0.96, 0.339999, 1.18), 0.307009, v(0.6, 0.25, 0.3)),
];

/// Scale of the wooden plane's placement.
pub const WOODEN_PLANE_SCALE: f32 = 0.22601;
/// Scale of the balloon's placement.
pub const BALLOON_SCALE: f32 = 0.0100093;
pub const WOODEN_PLANE_ALBEDO: Vec3 = Vec3::new(0.78, 0.6, 0.4);
pub const BALLOON_ALBEDO: Vec3 = Vec3::new(0.9, 0.2, 0.25);

/// World-space size a proxy cube aims for, before the placement scale.
const PROXY_WORLD_HALF_EXTENT: f32 = 0.04;

/// Half extent, in model units, of the cube that stands in for a missing
/// mesh so it renders at a visible size under its placement scale.
pub fn proxy_half_extent(handle: MeshHandle) -> f32 {
    let scale = match handle {
        mesh::WOODEN_PLANE => WOODEN_PLANE_SCALE,
        mesh::BALLOON => BALLOON_SCALE,
        _ => DRAW_ORDER
            .iter()
            .find_map(|slot| match slot {
                DrawSlot::Fixed(object) if object.mesh == handle => Some(object.placement.scale.x),
                _ => None,
            })
            .unwrap_or(1.0),
    };
    PROXY_WORLD_HALF_EXTENT / scale
}

/// Load every catalog mesh from under `root`. Missing files become proxies.
pub fn load_catalog(root: &Path) -> MeshLibrary {
    let mut library = MeshLibrary::new();
    for asset in MESH_CATALOG {
        library.load_or_proxy(
            asset.handle,
            root,
            asset.path,
            proxy_half_extent(asset.handle),
        );
    }
    tracing::info!(
        root = %root.display(),
        meshes = library.len(),
        proxies = library.proxy_count(),
        "mesh catalog loaded"
    );
    library
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_handles_are_dense_and_unique() {
        for (i, asset) in MESH_CATALOG.iter().enumerate() {
            assert_eq!(asset.handle, MeshHandle(i as u32), "{}", asset.name);
        }
        let paths: HashSet<_> = MESH_CATALOG.iter().map(|a| a.path).collect();
        assert_eq!(paths.len(), MESH_CATALOG.len());
    }

    #[test]
    fn every_drawn_mesh_is_in_the_catalog() {
        let catalog: HashSet<_> = MESH_CATALOG.iter().map(|a| a.handle).collect();
        for slot in DRAW_ORDER {
            assert!(catalog.contains(&slot.mesh()), "{}", slot.name());
        }
    }

    #[test]
    fn draw_order_has_twenty_eight_slots() {
        assert_eq!(DRAW_ORDER.len(), 28);
        assert_eq!(DRAW_ORDER[0].name(), "room");
        assert_eq!(DRAW_ORDER[1], DrawSlot::WoodenPlane);
        assert_eq!(DRAW_ORDER[5], DrawSlot::Balloon);
        assert_eq!(DRAW_ORDER[27].name(), "books");
    }

    #[test]
    fn room_model_matches_translate_then_scale() {
        let DrawSlot::Fixed(room) = DRAW_ORDER[0] else {
            panic!("room is fixed");
        };
        let model = room.placement.model(0.0);
        let corner = model.transform_point3(Vec3::ONE);
        let expected = Vec3::new(-0.18, -0.38, -0.1) + Vec3::splat(0.6);
        assert!(corner.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn proxy_size_scales_inversely() {
        assert!((proxy_half_extent(mesh::ROOM) - 0.04 / 0.6).abs() < 1e-6);
        assert!((proxy_half_extent(mesh::BALLOON) - 0.04 / 0.0100093).abs() < 1e-3);
        assert!(proxy_half_extent(mesh::SHELF) > 0.0);
    }

    #[test]
    fn empty_root_loads_all_proxies() {
        let dir = tempfile::tempdir().unwrap();
        let library = load_catalog(dir.path());
        assert_eq!(library.len(), MESH_CATALOG.len());
        assert_eq!(library.proxy_count(), MESH_CATALOG.len());
    }

    #[test]
    fn present_files_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let rug = dir.path().join("models/rug");
        std::fs::create_dir_all(&rug).unwrap();
        std::fs::write(rug.join("rug.obj"), "v 0 0 0\nv 1 0 0\nv 0 0 1\nf 1 2 3\n").unwrap();
        let library = load_catalog(dir.path());
        assert_eq!(library.proxy_count(), MESH_CATALOG.len() - 1);
        assert_eq!(library.get(mesh::RUG).unwrap().triangle_count(), 1);
    }
}
