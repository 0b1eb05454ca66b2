use shared_models::{Address, Borough, Geometry, Grade, Neighborhood, Restaurant};

/// Times Square, used as the reference point for proximity tests.
pub const TIMES_SQUARE: [f64; 2] = [-73.9855, 40.7580];

fn restaurant(
    id: &str,
    name: &str,
    borough: &str,
    cuisine: &str,
    street: &str,
    coord: [f64; 2],
    scores: &[i64],
) -> Restaurant {
    Restaurant {
        address: Address {
            building: "1".to_string(),
            coord: coord.to_vec(),
            street: street.to_string(),
            zipcode: "10000".to_string(),
        },
        borough: borough.to_string(),
        cuisine: cuisine.to_string(),
        grades: scores
            .iter()
            .map(|score| Grade {
                date: "2014-03-03T00:00:00Z".to_string(),
                grade: if *score < 14 { "A" } else { "B" }.to_string(),
                score: Some(*score),
            })
            .collect(),
        name: name.to_string(),
        restaurant_id: id.to_string(),
    }
}

fn square(west: f64, south: f64, east: f64, north: f64) -> Geometry {
    Geometry::polygon(vec![vec![
        [west, south],
        [east, south],
        [east, north],
        [west, north],
        [west, south],
    ]])
}

/// Nine restaurants; `r8` has an empty name and is hidden from lists.
pub fn restaurants() -> Vec<Restaurant> {
    vec![
        restaurant("r1", "Wendy'S", "Brooklyn", "Hamburgers", "Flatbush Avenue", [-73.961_704, 40.662_942], &[8, 23]),
        restaurant("r2", "Riviera Caterer", "Brooklyn", "American", "Stillwell Avenue", [-73.982_42, 40.579_505], &[5]),
        restaurant("r3", "Tov Kosher Kitchen", "Queens", "Jewish/Kosher", "63 Road", [-73.860_115_2, 40.731_173_9], &[20]),
        restaurant("r4", "Brunos On The Boulevard", "Queens", "American", "Astoria Boulevard", [-73.880_382_7, 40.764_312_4], &[12]),
        restaurant("r5", "Dj Reynolds Pub And Restaurant", "Manhattan", "Irish", "West 57 Street", [-73.985_135_6, 40.767_691_9], &[2]),
        restaurant("r6", "Wendy'S", "Manhattan", "Hamburgers", "Broadway", [-73.9855, 40.7580], &[11]),
        restaurant("r7", "Morris Park Bake Shop", "Bronx", "Bakery", "Morris Park Ave", [-73.856_077, 40.848_447], &[2, 10]),
        restaurant("r8", "", "Bronx", "Pizza", "Westchester Avenue", [-73.8283, 40.8396], &[]),
        restaurant("r9", "Carvel Ice Cream", "Brooklyn", "Ice Cream, Gelato, Yogurt, Ices", "Avenue U", [-73.9256, 40.6199], &[9]),
    ]
}

pub fn boroughs() -> Vec<Borough> {
    [
        ("Manhattan", square(-74.03, 40.70, -73.93, 40.88)),
        ("Brooklyn", square(-74.05, 40.57, -73.85, 40.70)),
        ("Queens", square(-73.93, 40.70, -73.70, 40.80)),
        ("Bronx", square(-73.93, 40.80, -73.75, 40.92)),
    ]
    .into_iter()
    .map(|(name, geometry)| Borough {
        geometry,
        name: name.to_string(),
    })
    .collect()
}

pub fn neighborhoods() -> Vec<Neighborhood> {
    [
        ("Midtown", square(-74.00, 40.75, -73.97, 40.77)),
        ("Park Slope", square(-73.99, 40.66, -73.96, 40.68)),
        ("Astoria", square(-73.94, 40.76, -73.90, 40.78)),
    ]
    .into_iter()
    .map(|(name, geometry)| Neighborhood {
        geometry,
        name: name.to_string(),
    })
    .collect()
}
