use std::sync::Arc;

use fp_raycaster::{
    camera::PerspectiveCamera,
    common::BoundBox,
    error::RenderError,
    picking::{
        shared_picker, ObjectId, PickingManager, PropId, PropPicker, SharedInteractor, Viewport,
        ViewportInteractor,
    },
    render::{
        BlendMode, ComponentLayout, Cropping, CroppingPreset, FixedPointRayCastMapper,
        RayCastImage, RenderOptions,
    },
    shading::Light,
    test_helpers,
    transfer_function::{ColorTransferFunction, Interpolation, PiecewiseFunction, VolumeProperty},
    volumetric::{ScalarData, ScalarType, Volume},
};
use nalgebra::{point, vector, Vector2};
use parking_lot::Mutex;

pub const RESOLUTION: Vector2<usize> = vector![32, 32];
pub const SIDE: usize = 16;

fn options() -> fp_raycaster::render::RenderOptionsBuilder {
    RenderOptions::builder().resolution(RESOLUTION).threads(3)
}

fn render(volume: &Volume, property: &VolumeProperty, options: RenderOptions) -> RayCastImage {
    let camera = test_helpers::front_camera(volume);
    let mut mapper = FixedPointRayCastMapper::new(options);
    mapper.render(volume, property, &camera, &[]).unwrap().clone()
}

fn center(image: &RayCastImage) -> [u16; 4] {
    image.pixel(RESOLUTION.x / 2, RESOLUTION.y / 2)
}

#[test]
fn sphere_renders_in_the_middle() {
    let volume = test_helpers::sphere_volume(SIDE);
    let property = test_helpers::threshold_property(60.0, 0.3);

    let image = render(&volume, &property, options().build().unwrap());

    assert_eq!(image.resolution(), RESOLUTION);
    assert!(center(&image)[3] > 0);
    assert_eq!(image.pixel(0, 0), [0; 4]);
    assert_eq!(image.to_rgb8().len(), RESOLUTION.x * RESOLUTION.y * 3);
}

#[test]
fn invalid_options_are_rejected() {
    let volume = test_helpers::sphere_volume(SIDE);
    let camera = test_helpers::front_camera(&volume);
    let mut mapper = FixedPointRayCastMapper::new(options().threads(0).build_unchecked());

    let result = mapper.render(&volume, &VolumeProperty::new(), &camera, &[]);
    assert!(matches!(result, Err(RenderError::InvalidOptions(_))));
    assert_eq!(mapper.tables().rebuild_count(), 0);
}

#[test]
fn four_component_float_is_rejected_before_any_work() {
    let volume = Volume::builder()
        .dims(vector![2, 2, 2])
        .components(4)
        .data(vec![0.5f32; 32])
        .build()
        .unwrap();
    let mut property = VolumeProperty::new();
    property.set_independent_components(false);
    let camera = test_helpers::front_camera(&volume);

    let mut mapper = FixedPointRayCastMapper::new(options().build().unwrap());
    let result = mapper.render(&volume, &property, &camera, &[]);

    assert_eq!(
        result.err(),
        Some(RenderError::FourComponentDependentType(ScalarType::F32))
    );
    assert_eq!(mapper.tables().rebuild_count(), 0);
    assert!(mapper.image().pixels().iter().all(|&v| v == 0));
    assert!(mapper.layout().is_none());
}

#[test]
fn failed_render_keeps_previous_image() {
    let sphere = test_helpers::sphere_volume(SIDE);
    let property = test_helpers::threshold_property(60.0, 0.3);
    let camera = test_helpers::front_camera(&sphere);
    let mut mapper = FixedPointRayCastMapper::new(options().build().unwrap());

    let before = mapper.render(&sphere, &property, &camera, &[]).unwrap().clone();

    let three = Volume::builder()
        .dims(vector![2, 2, 2])
        .components(3)
        .data(vec![0u8; 24])
        .build()
        .unwrap();
    let mut dependent = VolumeProperty::new();
    dependent.set_independent_components(false);

    assert_eq!(
        mapper.render(&three, &dependent, &camera, &[]).err(),
        Some(RenderError::ThreeComponentDependent)
    );
    assert_eq!(mapper.image(), &before);
    assert_eq!(mapper.tables().rebuild_count(), 1);
}

#[test]
fn kernel_failure_keeps_previous_image() {
    let sphere = test_helpers::sphere_volume(SIDE);
    let property = test_helpers::threshold_property(60.0, 0.3);
    let camera = test_helpers::front_camera(&sphere);
    let mut mapper = FixedPointRayCastMapper::new(options().build().unwrap());

    let before = mapper.render(&sphere, &property, &camera, &[]).unwrap().clone();
    assert!(center(&before)[3] > 0);

    // Labelled as bytes but without samples the kernel can read
    let unreadable = Volume::builder()
        .dims(sphere.dims())
        .data(ScalarData::Opaque {
            scalar_type: ScalarType::U8,
            values: SIDE * SIDE * SIDE,
            bytes: Vec::new(),
        })
        .build()
        .unwrap();

    assert_eq!(
        mapper.render(&unreadable, &property, &camera, &[]).err(),
        Some(RenderError::UnsupportedScalarType(ScalarType::U8))
    );
    assert_eq!(mapper.image(), &before);
    assert_eq!(mapper.layout(), Some(ComponentLayout::OneSimple));

    // The mapper recovers on the next valid render
    let after = mapper.render(&sphere, &property, &camera, &[]).unwrap();
    assert_eq!(after, &before);
}

#[test]
fn tables_are_rebuilt_only_after_changes() {
    let volume = test_helpers::sphere_volume(SIDE);
    let mut property = test_helpers::threshold_property(60.0, 0.3);
    let camera = test_helpers::front_camera(&volume);
    let mut mapper = FixedPointRayCastMapper::new(options().build().unwrap());

    mapper.render(&volume, &property, &camera, &[]).unwrap();
    mapper.render(&volume, &property, &camera, &[]).unwrap();
    assert_eq!(mapper.tables().rebuild_count(), 1);

    property
        .component_mut(0)
        .scalar_opacity_mut()
        .add_point(128.0, 0.9);
    mapper.render(&volume, &property, &camera, &[]).unwrap();
    assert_eq!(mapper.tables().rebuild_count(), 2);

    mapper.render(&volume, &property, &camera, &[]).unwrap();
    assert_eq!(mapper.tables().rebuild_count(), 2);
}

#[test]
fn early_termination_stays_within_threshold() {
    let volume = test_helpers::sphere_volume(SIDE);
    let property = test_helpers::threshold_property(20.0, 1.0);

    let full = render(
        &volume,
        &property,
        options().early_ray_termination(false).build().unwrap(),
    );
    let minimal = render(
        &volume,
        &property,
        options()
            .early_ray_termination(true)
            .termination_threshold(1)
            .build()
            .unwrap(),
    );
    let default = render(
        &volume,
        &property,
        options().early_ray_termination(true).build().unwrap(),
    );

    assert_eq!(full, minimal);
    // The center ray is opaque long before it leaves the sphere
    assert!(center(&full)[3] > 0x7fff - 0xff);
    for (a, b) in full.pixels().iter().zip(default.pixels()) {
        assert!(a.abs_diff(*b) <= 0xff);
    }
}

#[test]
fn empty_space_skipping_does_not_change_the_image() {
    let volume = test_helpers::sphere_volume(SIDE);

    for interpolation in [Interpolation::Nearest, Interpolation::Linear] {
        for blend in [
            BlendMode::Composite,
            BlendMode::MaximumIntensity,
            BlendMode::MinimumIntensity,
        ] {
            let mut property = test_helpers::threshold_property(150.0, 0.4);
            property.set_interpolation(interpolation);

            let plain = render(
                &volume,
                &property,
                options()
                    .blend_mode(blend)
                    .empty_space_skipping(false)
                    .build()
                    .unwrap(),
            );
            let skipping = render(
                &volume,
                &property,
                options()
                    .blend_mode(blend)
                    .empty_space_skipping(true)
                    .build()
                    .unwrap(),
            );
            assert_eq!(plain, skipping, "{:?} {:?}", interpolation, blend);
        }
    }
}

#[test]
fn maximum_and_minimum_projection() {
    let volume = test_helpers::sphere_volume(SIDE);
    let property = test_helpers::threshold_property(60.0, 1.0);

    let mip = render(
        &volume,
        &property,
        options()
            .blend_mode(BlendMode::MaximumIntensity)
            .build()
            .unwrap(),
    );
    let minip = render(
        &volume,
        &property,
        options()
            .blend_mode(BlendMode::MinimumIntensity)
            .build()
            .unwrap(),
    );

    // Dense core for the maximum, empty boundary for the minimum
    assert!(center(&mip)[3] > 0);
    assert_eq!(center(&minip)[3], 0);
}

// Same samples stored as offset 16-bit values go through the scaled conversion
#[test]
fn scaled_conversion_matches_identity_path() {
    const OFFSET: f64 = 1000.0;
    let simple = test_helpers::sphere_volume(SIDE);
    let shifted = Volume::builder()
        .dims(simple.dims())
        .data(
            test_helpers::sphere_data(SIDE)
                .into_iter()
                .map(|v| v as i16 + OFFSET as i16)
                .collect::<Vec<i16>>(),
        )
        .build()
        .unwrap();

    let property = |offset: f64| {
        let mut property = VolumeProperty::new();
        let component = property.component_mut(0);
        let mut color = ColorTransferFunction::new();
        color.add_rgb_point(offset, 0.0, 0.0, 0.0);
        color.add_rgb_point(offset + 255.0, 1.0, 0.5, 0.25);
        component.set_color(color);
        component.set_scalar_opacity(PiecewiseFunction::from_points(&[
            (offset, 0.0),
            (offset + 80.0, 0.0),
            (offset + 255.0, 0.5),
        ]));
        property
    };

    let camera = test_helpers::front_camera(&simple);
    let mut simple_mapper = FixedPointRayCastMapper::new(options().build().unwrap());
    let a = simple_mapper
        .render(&simple, &property(0.0), &camera, &[])
        .unwrap()
        .clone();
    let mut shifted_mapper = FixedPointRayCastMapper::new(options().build().unwrap());
    let b = shifted_mapper
        .render(&shifted, &property(OFFSET), &camera, &[])
        .unwrap()
        .clone();

    assert_eq!(simple_mapper.layout(), Some(ComponentLayout::OneSimple));
    assert_eq!(shifted_mapper.layout(), Some(ComponentLayout::One));
    assert_eq!(a, b);
}

#[test]
fn independent_components() {
    let sphere = test_helpers::sphere_data(SIDE);
    let mut data = Vec::with_capacity(sphere.len() * 2);
    for v in sphere {
        data.extend([v, 255 - v]);
    }
    let volume = Volume::builder()
        .dims(vector![SIDE, SIDE, SIDE])
        .components(2)
        .data(data)
        .build()
        .unwrap();

    let mut property = test_helpers::threshold_property(60.0, 0.5);
    property
        .component_mut(1)
        .set_scalar_opacity(PiecewiseFunction::from_points(&[(0.0, 0.0), (255.0, 0.0)]));

    let camera = test_helpers::front_camera(&volume);
    let mut mapper = FixedPointRayCastMapper::new(options().build().unwrap());
    let image = mapper.render(&volume, &property, &camera, &[]).unwrap();

    assert!(center(image)[3] > 0);
    assert_eq!(image.pixel(0, 0), [0; 4]);
    assert_eq!(mapper.layout(), Some(ComponentLayout::Independent(2)));

    mapper.set_options(
        options()
            .blend_mode(BlendMode::MaximumIntensity)
            .build()
            .unwrap(),
    );
    let image = mapper.render(&volume, &property, &camera, &[]).unwrap();
    assert!(center(image)[3] > 0);
}

fn interleave(components: &[Vec<u8>]) -> Vec<u8> {
    (0..components[0].len())
        .flat_map(|i| components.iter().map(move |c| c[i]))
        .collect()
}

fn dependent_volume(components: &[Vec<u8>]) -> Volume {
    Volume::builder()
        .dims(vector![SIDE, SIDE, SIDE])
        .components(components.len())
        .data(interleave(components))
        .build()
        .unwrap()
}

#[test]
fn two_dependent_components() {
    let sphere = test_helpers::sphere_data(SIDE);
    let single = test_helpers::sphere_volume(SIDE);
    let two = dependent_volume(&[sphere.clone(), sphere]);

    let mut property = test_helpers::threshold_property(60.0, 0.5);
    let reference = render(&single, &property, options().build().unwrap());
    property.set_independent_components(false);

    let camera = test_helpers::front_camera(&two);
    let mut mapper = FixedPointRayCastMapper::new(options().build().unwrap());
    let image = &mapper.render(&two, &property, &camera, &[]).unwrap().clone();

    assert_eq!(mapper.layout(), Some(ComponentLayout::TwoDependent));
    // Color of component 0 and opacity of component 1 are the single component samples
    assert_eq!(image, &reference);

    // Opacity follows component 1 only
    let transparent = dependent_volume(&[
        test_helpers::sphere_data(SIDE),
        vec![0; SIDE * SIDE * SIDE],
    ]);
    let image = mapper.render(&transparent, &property, &camera, &[]).unwrap();
    assert!(image.pixels().iter().all(|&v| v == 0));
}

#[test]
fn four_dependent_components() {
    let sphere = test_helpers::sphere_data(SIDE);
    let blank = vec![0u8; sphere.len()];
    let four = dependent_volume(&[sphere.clone(), blank.clone(), blank, sphere]);

    let mut property = test_helpers::threshold_property(60.0, 0.5);
    let reference = render(
        &test_helpers::sphere_volume(SIDE),
        &property,
        options().build().unwrap(),
    );
    property.set_independent_components(false);

    let camera = test_helpers::front_camera(&four);
    let mut mapper = FixedPointRayCastMapper::new(options().build().unwrap());
    let image = &mapper.render(&four, &property, &camera, &[]).unwrap().clone();

    assert_eq!(mapper.layout(), Some(ComponentLayout::FourDependent));
    // Raw red, opacity from component 3
    assert!(center(image)[0] > 0);
    let pixels = image.pixels().chunks_exact(4);
    for (pixel, expected) in pixels.zip(reference.pixels().chunks_exact(4)) {
        assert_eq!(pixel[1], 0);
        assert_eq!(pixel[2], 0);
        assert_eq!(pixel[3], expected[3]);
    }
}

#[test]
fn gradient_opacity_with_empty_space_skipping() {
    let volume = test_helpers::sphere_volume(SIDE);

    for interpolation in [Interpolation::Nearest, Interpolation::Linear] {
        let mut property = test_helpers::threshold_property(40.0, 0.6);
        property.set_interpolation(interpolation);
        let without_gradient = render(&volume, &property, options().build().unwrap());

        property
            .component_mut(0)
            .set_gradient_opacity(Some(PiecewiseFunction::from_points(&[
                (0.0, 0.0),
                (10.0, 0.0),
                (40.0, 1.0),
            ])));

        let plain = render(
            &volume,
            &property,
            options().empty_space_skipping(false).build().unwrap(),
        );
        let skipping = render(
            &volume,
            &property,
            options().empty_space_skipping(true).build().unwrap(),
        );

        assert_eq!(plain, skipping, "{:?}", interpolation);
        assert_ne!(plain, without_gradient, "{:?}", interpolation);
    }
}

fn side_is_empty(image: &RayCastImage, columns: std::ops::Range<usize>) -> bool {
    (0..RESOLUTION.y).all(|y| columns.clone().all(|x| image.pixel(x, y) == [0; 4]))
}

#[test]
fn cropped_half_contributes_nothing() {
    let volume = test_helpers::sphere_volume(SIDE);
    // Keeps x <= 7.5, the plane through the sphere center
    let cropping = Cropping::with_preset(
        point![-1.0, -1.0, -1.0],
        point![7.5, 100.0, 100.0],
        CroppingPreset::SubVolume,
    );

    for interpolation in [Interpolation::Nearest, Interpolation::Linear] {
        let mut property = test_helpers::threshold_property(60.0, 0.5);
        property.set_interpolation(interpolation);

        let full = render(&volume, &property, options().build().unwrap());
        let cropped = render(
            &volume,
            &property,
            options().cropping(cropping).build().unwrap(),
        );

        let left = 0..RESOLUTION.x / 2 - 2;
        let right = RESOLUTION.x / 2 + 2..RESOLUTION.x;
        assert!(!side_is_empty(&full, left.clone()) && !side_is_empty(&full, right.clone()));
        // Exactly one half of the image is removed
        assert!(side_is_empty(&cropped, left) ^ side_is_empty(&cropped, right));
    }

    // Nearest samples round to the closest voxel: cropping at the boundary between
    // voxels 7 and 8 equals clearing every voxel from 8 on
    let mut cleared = test_helpers::sphere_data(SIDE);
    for (i, v) in cleared.iter_mut().enumerate() {
        if i % SIDE >= 8 {
            *v = 0;
        }
    }
    let cleared = Volume::builder()
        .dims(volume.dims())
        .data(cleared)
        .build()
        .unwrap();
    let property = test_helpers::threshold_property(60.0, 0.5);
    assert_eq!(
        render(&volume, &property, options().cropping(cropping).build().unwrap()),
        render(&cleared, &property, options().build().unwrap())
    );
}

#[test]
fn shaded_render_with_lights() {
    let volume = test_helpers::sphere_volume(SIDE);
    let mut property = test_helpers::threshold_property(100.0, 0.8);
    property.set_shade(true);
    property.set_interpolation(Interpolation::Linear);
    let camera = test_helpers::front_camera(&volume);

    let mut mapper = FixedPointRayCastMapper::new(options().build().unwrap());
    let headlight = mapper
        .render(&volume, &property, &camera, &[])
        .unwrap()
        .clone();
    assert!(mapper.gradients().is_some());
    assert!(center(&headlight)[0] > 0);

    // Light from behind the sphere leaves only ambient and the front darker
    let back = Light::directional(vector![0.0, 0.0, 1.0], vector![1.0, 1.0, 1.0], 1.0);
    let lit_from_back = mapper.render(&volume, &property, &camera, &[back]).unwrap();
    assert!(center(lit_from_back)[0] < center(&headlight)[0]);
    assert_eq!(center(lit_from_back)[3], center(&headlight)[3]);
}

#[test]
fn picking_manager_scenario() {
    let mut manager = PickingManager::new();
    let mut picker = PropPicker::new();
    picker.add_prop(
        PropId(7),
        BoundBox::new(point![-1.0, -1.0, -1.0], point![1.0, 1.0, 1.0]),
    );
    let picker = shared_picker(picker);
    let widget_a = Some(ObjectId::new());
    let widget_b = Some(ObjectId::new());

    manager.add_picker(&picker, widget_a);
    manager.add_picker(&picker, widget_b);
    manager.add_picker(&picker, widget_b);
    assert_eq!(manager.number_of_pickers(), 1);
    assert_eq!(manager.number_of_objects_linked(Some(&picker)), 2);

    let camera = PerspectiveCamera::new(point![0.0, 0.0, 10.0], vector![0.0, 0.0, -1.0]);
    let mut interactor = ViewportInteractor::new(Viewport::new(camera, RESOLUTION));
    interactor.set_event_position(16.0, 16.0);
    let interactor = Arc::new(Mutex::new(interactor));
    let shared: SharedInteractor = interactor.clone();
    manager.set_interactor(Some(&shared));
    manager.set_enabled(true);

    assert!(manager.pick(widget_a));
    assert!(manager.pick(widget_b));

    manager.remove_object(widget_a);
    assert_eq!(manager.number_of_objects_linked(Some(&picker)), 1);
    assert!(!manager.pick(widget_a));

    manager.remove_object(widget_b);
    assert_eq!(manager.number_of_pickers(), 0);
    assert!(manager.select_picker().is_none());
}
