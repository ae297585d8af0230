use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sqlmap::{Configuration, Settings, SqlCommandType, Value};

const FIND_USERS: &str = r#"<script>
    select id, name, email from users
    <where>
        <if test="name != null">and name like #{name}</if>
        <if test="active != null">and active = #{active}</if>
        <if test="ids != null and ids.size() > 0">
            and id in
            <foreach collection="ids" item="id" open="(" separator="," close=")">#{id}</foreach>
        </if>
    </where>
    order by ${orderBy}
</script>"#;

fn configuration() -> Configuration {
    let mut configuration = Configuration::new(Settings::default().shrink_whitespaces_in_sql(true));
    configuration
        .add_statement("findUsers", SqlCommandType::Select, FIND_USERS)
        .unwrap();
    configuration
        .add_statement(
            "findUser",
            SqlCommandType::Select,
            "select id, name from users where id = #{id}",
        )
        .unwrap();
    configuration
}

fn parameter(n: i64) -> Value {
    Value::map([
        ("name", Value::from("a%")),
        ("active", Value::Bool(true)),
        ("ids", Value::from((0..n).collect::<Vec<_>>())),
        ("orderBy", Value::from("id")),
    ])
}

fn bench_dynamic_render(c: &mut Criterion) {
    let configuration = configuration();
    let statement = configuration.mapped_statement("findUsers").unwrap();
    let mut group = c.benchmark_group("render/dynamic_foreach");

    for n in [1, 10, 100, 500] {
        let parameter = parameter(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &parameter, |b, parameter| {
            b.iter(|| black_box(statement.bound_sql(parameter, &configuration).unwrap()));
        });
    }

    group.finish();
}

fn bench_raw_render(c: &mut Criterion) {
    let configuration = configuration();
    let statement = configuration.mapped_statement("findUser").unwrap();
    let parameter = Value::map([("id", 1)]);

    c.bench_function("render/raw", |b| {
        b.iter(|| black_box(statement.bound_sql(&parameter, &configuration).unwrap()));
    });
}

fn bench_parameter_values(c: &mut Criterion) {
    let configuration = configuration();
    let statement = configuration.mapped_statement("findUsers").unwrap();
    let mut group = c.benchmark_group("render/parameter_values");

    for n in [10, 100] {
        let bound = statement.bound_sql(&parameter(n), &configuration).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &bound, |b, bound| {
            b.iter(|| black_box(bound.parameter_values(configuration.reflector_factory()).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_dynamic_render,
    bench_raw_render,
    bench_parameter_values
);
criterion_main!(benches);
