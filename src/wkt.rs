//! Well-known text for zone boundaries.
//!
//! Only `POLYGON` and `MULTIPOLYGON` in two dimensions are accepted, with an
//! optional EWKT `SRID=...;` prefix. Nothing is repaired: an unclosed or
//! degenerate ring is an error.

use crate::error::GeometryParseError;
use crate::types::ParsedGeometry;
use geo::{Coord, LineString, MultiPolygon, Polygon};
use nom::character::complete::{alpha1, char, multispace0, multispace1};
use nom::combinator::{all_consuming, map};
use nom::multi::separated_list1;
use nom::number::complete::double;
use nom::sequence::{delimited, preceded, separated_pair, terminated};
use nom::IResult;
use std::fmt::Write;

type Ring = Vec<Coord<f64>>;

/// Parses WKT into a polygon or multipolygon.
pub fn decode(text: &str) -> Result<ParsedGeometry, GeometryParseError> {
    if text.trim().is_empty() {
        return Err(GeometryParseError::Empty);
    }

    let body = strip_srid(text.trim_start());
    let (rest, keyword) = alpha1::<_, nom::error::Error<&str>>(body)
        .map_err(|_| syntax_error(text, body, "expected a geometry keyword"))?;

    if rest
        .trim_start()
        .get(..5)
        .map_or(false, |word| word.eq_ignore_ascii_case("EMPTY"))
    {
        return Err(GeometryParseError::Empty);
    }

    match keyword.to_ascii_uppercase().as_str() {
        "POLYGON" => {
            let rings = run(polygon_rings, text, rest)?;
            Ok(ParsedGeometry::Polygon(build_polygon(rings)?))
        }
        "MULTIPOLYGON" => {
            let parts = run(multipolygon_parts, text, rest)?;
            let polygons = parts
                .into_iter()
                .map(build_polygon)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ParsedGeometry::MultiPolygon(MultiPolygon::new(polygons)))
        }
        other => Err(GeometryParseError::Unsupported(other.to_string())),
    }
}

/// Writes canonical WKT for a decoded geometry.
pub fn encode(geometry: &ParsedGeometry) -> String {
    let mut out = String::new();
    match geometry {
        ParsedGeometry::Polygon(polygon) => {
            out.push_str("POLYGON ");
            write_polygon(&mut out, polygon);
        }
        ParsedGeometry::MultiPolygon(multi) => {
            out.push_str("MULTIPOLYGON (");
            for (i, polygon) in multi.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_polygon(&mut out, polygon);
            }
            out.push(')');
        }
    }
    out
}

fn write_polygon(out: &mut String, polygon: &Polygon<f64>) {
    out.push('(');
    let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
    for (i, ring) in rings.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('(');
        for (j, coord) in ring.coords().enumerate() {
            if j > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{} {}", coord.x, coord.y);
        }
        out.push(')');
    }
    out.push(')');
}

fn strip_srid(text: &str) -> &str {
    match text.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("SRID=") => match text.find(';') {
            Some(pos) => text[pos + 1..].trim_start(),
            None => text,
        },
        _ => text,
    }
}

fn run<'a, O>(
    parser: impl FnMut(&'a str) -> IResult<&'a str, O>,
    text: &'a str,
    input: &'a str,
) -> Result<O, GeometryParseError> {
    all_consuming(delimited(multispace0, parser, multispace0))(input)
        .map(|(_, out)| out)
        .map_err(|err| match err {
            nom::Err::Error(err) | nom::Err::Failure(err) => {
                syntax_error(text, err.input, &format!("unexpected input ({:?})", err.code))
            }
            nom::Err::Incomplete(_) => syntax_error(text, "", "unexpected end of input"),
        })
}

fn syntax_error(text: &str, remaining: &str, message: &str) -> GeometryParseError {
    let offset = text.len().saturating_sub(remaining.len());
    let near: String = remaining.chars().take(16).collect();
    let message = if near.is_empty() {
        message.to_string()
    } else {
        format!("{message} near `{near}`")
    };
    GeometryParseError::Syntax { offset, message }
}

/// `( item , item ... )` with free whitespace.
fn list<'a, O>(
    item: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, Vec<O>> {
    delimited(
        terminated(char('('), multispace0),
        separated_list1(delimited(multispace0, char(','), multispace0), item),
        preceded(multispace0, char(')')),
    )
}

fn coord(input: &str) -> IResult<&str, Coord<f64>> {
    map(separated_pair(double, multispace1, double), |(x, y)| Coord { x, y })(input)
}

fn ring(input: &str) -> IResult<&str, Ring> {
    list(coord)(input)
}

fn polygon_rings(input: &str) -> IResult<&str, Vec<Ring>> {
    list(ring)(input)
}

fn multipolygon_parts(input: &str) -> IResult<&str, Vec<Vec<Ring>>> {
    list(polygon_rings)(input)
}

fn build_polygon(rings: Vec<Ring>) -> Result<Polygon<f64>, GeometryParseError> {
    let mut rings = rings.into_iter().map(build_ring);
    let exterior = match rings.next() {
        Some(ring) => ring?,
        None => return Err(GeometryParseError::Empty),
    };
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn build_ring(coords: Ring) -> Result<LineString<f64>, GeometryParseError> {
    if coords.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(GeometryParseError::NonFiniteCoordinate);
    }
    if coords.len() < 4 {
        return Err(GeometryParseError::TooFewPositions(coords.len()));
    }
    if coords.first() != coords.last() {
        return Err(GeometryParseError::UnclosedRing);
    }
    Ok(LineString::new(coords))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = "POLYGON ((0 0, 0 2, 2 2, 2 0, 0 0))";

    #[test]
    fn test_decode_polygon() {
        let geometry = decode(SQUARE).unwrap();
        let ParsedGeometry::Polygon(polygon) = &geometry else {
            panic!("expected a polygon, got {geometry:?}");
        };
        assert_eq!(polygon.exterior().0.len(), 5);
        assert_eq!(polygon.exterior().0[2], Coord { x: 2.0, y: 2.0 });
    }

    #[test]
    fn test_decode_multipolygon_with_hole() {
        let text = "MULTIPOLYGON (((0 0, 10 0, 10 10, 0 10, 0 0), (2 2, 4 2, 4 4, 2 2)), \
                    ((20 20, 21 20, 21 21, 20 20)))";
        let geometry = decode(text).unwrap();
        assert!(matches!(geometry, ParsedGeometry::MultiPolygon(_)));
        assert_eq!(geometry.polygons().len(), 2);
        assert_eq!(geometry.ring_count(), 3);
        assert_eq!(geometry.vertex_count(), 13);
    }

    #[test]
    fn test_decode_is_lenient_on_case_and_spacing() {
        let geometry = decode("  polygon((-1.5 52.25,-1.0 52.25,-1.0 53,-1.5 52.25))  ").unwrap();
        assert_eq!(geometry.vertex_count(), 4);
    }

    #[test]
    fn test_decode_srid_prefix() {
        let geometry = decode("SRID=4326;POLYGON ((0 0, 0 2, 2 2, 2 0, 0 0))").unwrap();
        assert_eq!(geometry.ring_count(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decode(""), Err(GeometryParseError::Empty));
        assert_eq!(decode("   "), Err(GeometryParseError::Empty));
        assert_eq!(decode("POLYGON EMPTY"), Err(GeometryParseError::Empty));
    }

    #[test]
    fn test_unsupported_kind() {
        assert_eq!(
            decode("POINT (1 2)"),
            Err(GeometryParseError::Unsupported("POINT".to_string()))
        );
        assert!(matches!(
            decode("LINESTRING (0 0, 1 1)"),
            Err(GeometryParseError::Unsupported(_))
        ));
    }

    #[test]
    fn test_syntax_errors_report_offset() {
        match decode("POLYGON ((0 0, 0 2, 2 2, 2 0, 0 0)") {
            Err(GeometryParseError::Syntax { offset, .. }) => assert!(offset > 8),
            other => panic!("expected syntax error, got {other:?}"),
        }
        assert!(matches!(
            decode("POLYGON ((0 0, 0 x, 2 2, 0 0))"),
            Err(GeometryParseError::Syntax { .. })
        ));
        assert!(matches!(decode("12 34"), Err(GeometryParseError::Syntax { offset: 0, .. })));
        assert!(matches!(
            decode("POLYGON ((0 0, 0 2, 2 2, 2 0, 0 0)) trailing"),
            Err(GeometryParseError::Syntax { .. })
        ));
    }

    #[test]
    fn test_rings_are_not_repaired() {
        assert_eq!(
            decode("POLYGON ((0 0, 0 2, 2 2, 2 0))"),
            Err(GeometryParseError::UnclosedRing)
        );
        assert_eq!(
            decode("POLYGON ((0 0, 1 1, 0 0))"),
            Err(GeometryParseError::TooFewPositions(3))
        );
        assert_eq!(
            decode("POLYGON ((0 0, inf 1, 1 1, 0 0))"),
            Err(GeometryParseError::NonFiniteCoordinate)
        );
    }

    #[test]
    fn test_reencoding_keeps_structure() {
        let inputs = [
            SQUARE,
            "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0), (2 2, 4 2, 4 4, 2 2))",
            "MULTIPOLYGON (((-0.12 51.5, -0.1 51.5, -0.1 51.52, -0.12 51.5)), \
             ((1.25 52.625, 1.3 52.625, 1.3 52.7, 1.25 52.7, 1.25 52.625)))",
        ];
        for input in inputs {
            let first = decode(input).unwrap();
            let second = decode(&encode(&first)).unwrap();
            assert_eq!(first.ring_count(), second.ring_count(), "{input}");
            assert_eq!(first.vertex_count(), second.vertex_count(), "{input}");
            assert_eq!(first, second, "{input}");
        }
    }

    /// Closed ring around `(cx, cy)` with `n` distinct vertices.
    fn ring_wkt(cx: f64, cy: f64, radius: f64, n: usize) -> String {
        let mut coords: Vec<String> = (0..n)
            .map(|i| {
                let angle = i as f64 * std::f64::consts::TAU / n as f64;
                format!("{} {}", cx + radius * angle.cos(), cy + radius * angle.sin())
            })
            .collect();
        coords.push(coords[0].clone());
        format!("({})", coords.join(", "))
    }

    #[test]
    fn test_reencoding_generated_shapes() {
        let mut inputs = Vec::new();
        for n in 3..12 {
            let cx = -10.0 + n as f64 * 1.37;
            let cy = 45.0 - n as f64 * 0.61;
            let outer = ring_wkt(cx, cy, 1.0 + n as f64 / 7.0, n);
            let hole = ring_wkt(cx, cy, 0.3, 3 + n % 4);
            inputs.push(format!("POLYGON ({outer})"));
            inputs.push(format!("POLYGON ({outer}, {hole})"));
            let other = ring_wkt(cx + 5.0, cy - 3.0, 0.5, n + 2);
            inputs.push(format!("MULTIPOLYGON (({outer}, {hole}), ({other}))"));
        }

        for input in &inputs {
            let first = decode(input).unwrap();
            let second = decode(&encode(&first)).unwrap();
            assert_eq!(first.ring_count(), second.ring_count(), "{input}");
            assert_eq!(first.vertex_count(), second.vertex_count(), "{input}");
            assert_eq!(first, second, "{input}");
        }
    }

    #[test]
    fn test_encode_format() {
        assert_eq!(encode(&decode(SQUARE).unwrap()), SQUARE);
        assert_eq!(
            encode(&decode("MULTIPOLYGON(((0 0,1 0,1 1,0 0)))").unwrap()),
            "MULTIPOLYGON (((0 0, 1 0, 1 1, 0 0)))"
        );
    }
}
