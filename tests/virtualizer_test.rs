use datatable::virtualizer::{ViewportMetrics, Virtualizer, plan_window};

fn metrics(offset: f64) -> ViewportMetrics {
    ViewportMetrics {
        scroll_offset: offset,
        viewport_height: 600.0,
        row_height: 45.0,
        overscan: 5,
    }
}

#[test]
fn test_window_in_the_middle_of_a_long_list() {
    let plan = plan_window(1000, &metrics(4500.0));

    assert_eq!(plan.total_size, 45_000.0);
    assert_eq!(plan.scroll_offset, 4500.0);
    assert_eq!(plan.range, 95..119);
    assert_eq!(plan.items.len(), plan.range.len());

    // rows 100..=113 intersect the viewport and must be realized
    for index in 100..114 {
        assert!(plan.range.contains(&index), "row {} missing", index);
    }

    let mut previous = None;
    for item in &plan.items {
        assert_eq!(item.start, item.index as f64 * 45.0);
        assert_eq!(item.size, 45.0);
        if let Some(prev) = previous {
            assert!(item.start > prev);
        }
        previous = Some(item.start);
    }
}

#[test]
fn test_window_at_top() {
    let plan = plan_window(1000, &metrics(0.0));
    // ceil(600 / 45) = 14 visible rows plus 5 overscan below
    assert_eq!(plan.range, 0..19);
    assert_eq!(plan.items[0].start, 0.0);
}

#[test]
fn test_empty_list_has_empty_window() {
    let plan = plan_window(0, &metrics(300.0));
    assert!(plan.is_empty());
    assert!(plan.items.is_empty());
    assert_eq!(plan.total_size, 0.0);
}

#[test]
fn test_offset_is_clamped_to_scrollable_extent() {
    let plan = plan_window(1000, &metrics(1.0e9));
    assert_eq!(plan.scroll_offset, 45_000.0 - 600.0);
    assert_eq!(plan.range.end, 1000);
    assert_eq!(plan.range.start, 981);

    let plan = plan_window(1000, &metrics(-50.0));
    assert_eq!(plan.scroll_offset, 0.0);
    assert_eq!(plan.range.start, 0);
}

#[test]
fn test_short_list_fits_without_scrolling() {
    let plan = plan_window(3, &metrics(500.0));
    assert_eq!(plan.scroll_offset, 0.0);
    assert_eq!(plan.range, 0..3);
    assert_eq!(plan.total_size, 135.0);
}

#[test]
fn test_shrinking_count_reclamps_offset() {
    let mut v = Virtualizer::new(metrics(0.0));
    v.set_count(1000);
    v.scroll_to(9000.0);
    assert_eq!(v.metrics().scroll_offset, 9000.0);

    v.set_count(20);
    assert_eq!(v.metrics().scroll_offset, 20.0 * 45.0 - 600.0);
    assert_eq!(v.window().range.end, 20);
}

#[test]
fn test_scroll_to_index_puts_row_on_top() {
    let mut v = Virtualizer::new(metrics(0.0));
    v.set_count(1000);
    v.scroll_to_index(200);
    let plan = v.window();
    assert_eq!(plan.scroll_offset, 9000.0);
    assert_eq!(plan.range.start, 195);
}
